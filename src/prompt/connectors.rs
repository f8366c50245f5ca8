// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Connector prompts. The application login defaults to the login of the replication service
//! the connector is bound to.

use crate::{
    error::Result,
    group::{service_alias, Group, Member, DEFAULTS, DEPLOYMENT_DATASERVICE, DEPLOYMENT_HOST},
    resolve::Resolver,
};

use super::{Prompt, PromptRegistry, Validator};

/// The replication service whose datasource this connector talks to: the one on the same
/// host if there is one, otherwise the first replication service of the dataservice (or of
/// its first constituent, for composite dataservices).
pub fn bound_replication_service(r: &Resolver, m: &Member) -> Option<Member> {
    let ds = r.dataservice_of(m)?;
    let host = r.host_of(m)?;
    let group = Group::ReplicationServices;
    let store = r.store();

    let local = service_alias(&ds, &host);
    if store.contains(&[group.key(), &local]) {
        return Some(Member::new(group, local));
    }

    let mut candidates = vec![ds.clone()];
    candidates.extend(r.topology(&ds).constituents.iter().map(|c| c.dataservice.clone()));
    for candidate in candidates {
        let found = store.keys(&[group.key()]).into_iter().find(|alias| {
            alias != DEFAULTS
                && store
                    .get_string(&[group.key(), alias, DEPLOYMENT_DATASERVICE])
                    .as_deref()
                    == Some(candidate.as_str())
                && store
                    .get_string(&[group.key(), alias, DEPLOYMENT_HOST])
                    .is_some()
        });
        if let Some(alias) = found {
            return Some(Member::new(group, alias));
        }
    }
    None
}

fn login_from_replicator(r: &Resolver, m: &Member, field: &str) -> Result<Option<String>> {
    match bound_replication_service(r, m) {
        Some(repl) => Ok(Some(r.value(&repl, field)?)),
        None => Ok(None),
    }
}

fn default_user(r: &Resolver, m: &Member) -> Result<Option<String>> {
    login_from_replicator(r, m, "datasource_user")
}

fn default_password(r: &Resolver, m: &Member) -> Result<Option<String>> {
    login_from_replicator(r, m, "datasource_password")
}

pub fn register(registry: &mut PromptRegistry) {
    let g = Group::Connectors;

    registry.register(
        Prompt::new(g, "conn_listen_port", Validator::Port)
            .describe("Port applications connect to")
            .alias("--connector-listen-port")
            .default_value("9999"),
    );
    registry.register(
        Prompt::new(g, "conn_user", Validator::Text)
            .describe("Application login")
            .alias("--application-user")
            .alias("--connector-user")
            .default_fn(default_user)
            .required(),
    );
    registry.register(
        Prompt::new(g, "conn_password", Validator::Text)
            .describe("Application password")
            .alias("--application-password")
            .alias("--connector-password")
            .default_fn(default_password),
    );
    registry.register(
        Prompt::new(g, "conn_readonly", Validator::Boolean)
            .describe("Route every connection to a slave")
            .alias("--connector-readonly")
            .default_value("false"),
    );
    registry.register(
        Prompt::new(g, "conn_bridge_mode", Validator::Boolean)
            .describe("Pass traffic through without inspecting it")
            .alias("--connector-bridge-mode")
            .default_value("true"),
    );
    registry.register(
        Prompt::new(g, "conn_autoreconnect", Validator::Boolean)
            .describe("Reconnect clients transparently after a switch")
            .alias("--connector-autoreconnect")
            .default_value("true"),
    );
}
