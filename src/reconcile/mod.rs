// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Multi-host reconciliation: ask every target host for its persisted configuration, then
//! merge what came back into one canonical tree.

pub mod fetch;
pub mod legacy;
pub mod merge;
pub mod prune;

use std::collections::BTreeSet;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::{
    cluster::Cluster,
    error::{ConfigError, Report, Result},
    group::Member,
    remote::Endpoint,
    store::PropertyStore,
};

pub use merge::{merge, Conflict, MergeOutcome};

/// What one host sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum HostConfig {
    Current(PropertyStore),
    Legacy(Map<String, Value>),
    /// Reached, but nothing is configured there yet.
    Unconfigured,
}

pub fn classify(response: &str) -> HostConfig {
    let response = response.trim();
    if response.is_empty() {
        return HostConfig::Unconfigured;
    }
    match serde_json::from_str::<Value>(response) {
        Ok(Value::Object(document)) if document.is_empty() => HostConfig::Unconfigured,
        Ok(Value::Object(document)) if legacy::is_legacy(&document) => HostConfig::Legacy(document),
        Ok(Value::Object(document)) => match PropertyStore::from_value(Value::Object(document)) {
            Ok(store) => HostConfig::Current(store),
            Err(_) => HostConfig::Unconfigured,
        },
        Ok(_) | Err(_) => {
            debug!("response is not a configuration document; treating host as unconfigured");
            HostConfig::Unconfigured
        }
    }
}

/// The query command for each host, with `{home}` replaced by the host's installation
/// directory as the local configuration knows it. Hosts are reached as their configured user
/// and SSH port.
pub fn query_commands(cluster: &Cluster, hosts: &[String]) -> Result<Vec<(Endpoint, String)>> {
    let resolver = cluster.resolver();
    hosts
        .iter()
        .map(|host| {
            let member: Member = resolver.host_by_name(host);
            let home = resolver.value(&member, "home_directory")?;
            let command = cluster.context.query_command.replace("{home}", &home);
            Ok((resolver.endpoint_for(&member, host)?, command))
        })
        .collect()
}

/// Fetch every host's configuration and merge the results against the local configuration.
/// Unreachable hosts are dropped with a warning; if none can be reached the run fails. With no
/// hosts at all the local configuration is returned as it is, pruned.
pub fn reconcile(cluster: &Cluster, hosts: &[String], report: &mut Report) -> Result<MergeOutcome> {
    let mut seen = BTreeSet::new();
    let hosts: Vec<String> = hosts
        .iter()
        .filter(|h| seen.insert(h.to_string()))
        .cloned()
        .collect();
    if hosts.is_empty() {
        debug!("no hosts to reconcile");
        return Ok(merge(cluster.store(), &[], None, report));
    }

    let requests = query_commands(cluster, &hosts)?;
    let context = &cluster.context;
    let results = fetch::fetch_all(
        requests,
        std::sync::Arc::clone(&context.executor),
        context.fetch_timeout,
    )?;

    let mut reached = 0;
    let mut sources: Vec<(String, PropertyStore)> = Vec::new();
    let mut legacy_documents: Vec<(String, Map<String, Value>)> = Vec::new();

    // Keep target order, which decides the anchor when none is given.
    for host in &hosts {
        match results.get(host) {
            Some(Ok(response)) => {
                reached += 1;
                match classify(response) {
                    HostConfig::Current(store) => sources.push((host.clone(), store)),
                    HostConfig::Legacy(document) => legacy_documents.push((host.clone(), document)),
                    HostConfig::Unconfigured => debug!("{host} has no configuration yet"),
                }
            }
            Some(Err(message)) => {
                report.warning(host.clone(), format!("dropped from reconciliation: {message}"));
            }
            None => warn!("no fetch result recorded for {host}"),
        }
    }

    if reached == 0 {
        return Err(ConfigError::AllHostsUnreachable(hosts));
    }

    if !legacy_documents.is_empty() {
        let migrated = legacy::migrate_legacy(&legacy_documents, report);
        sources.push(("legacy".to_string(), migrated));
    }

    let default_host = context
        .default_host
        .as_deref()
        .filter(|h| sources.iter().any(|(host, _)| host == h));
    if context.default_host.is_some() && default_host.is_none() {
        report.warning(
            "--default-host",
            "the requested default host returned no configuration",
        );
    }

    Ok(merge(cluster.store(), &sources, default_host, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_responses() {
        assert_eq!(classify(""), HostConfig::Unconfigured);
        assert_eq!(classify("command not found"), HostConfig::Unconfigured);
        assert_eq!(classify("{}"), HostConfig::Unconfigured);
        assert!(matches!(
            classify(r#"{"service_name": "alpha"}"#),
            HostConfig::Legacy(_)
        ));
        assert!(matches!(
            classify(r#"{"dataservices": {"alpha": {}}}"#),
            HostConfig::Current(_)
        ));
    }
}
