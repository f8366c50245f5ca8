// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! fragments.rs
//!
//! Configuration fragment files. Each TOML table is one `configure` request:
//!
//! ```toml
//! [defaults]
//! datasource-user = "tungsten"
//!
//! [alpha]
//! members = "db1,db2,db3"
//! master = "db1"
//!
//! [alpha@db3]
//! thl-port = 2113
//! ```
//!
//! Tables are applied from the least to the most specific so that narrower tables win.

use std::{collections::BTreeMap, fs, path::Path};

use log::debug;

use crate::{
    cluster::{Cluster, ConfigureRequest},
    error::{ConfigError, Report, Result},
    group::DEFAULTS,
    settings::Setting,
    store::split_list,
};

type Section = BTreeMap<String, toml::Value>;

/// Order in which a table applies; lower weights apply first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weight {
    Defaults = 0,
    Service = 1,
    Relay = 2,
    Composite = 3,
    HostSpecific = 4,
}

#[derive(Debug, Clone)]
pub struct Fragment {
    pub name: String,
    pub weight: Weight,
    pub request: ConfigureRequest,
}

fn normalized(key: &str) -> String {
    key.trim_end_matches(['+', '-'])
        .replace('_', "-")
}

fn has_key(section: &Section, key: &str) -> bool {
    section.keys().any(|k| normalized(k) == key)
}

fn weight(name: &str, section: &Section) -> Weight {
    if name.contains('@') {
        Weight::HostSpecific
    } else if name == DEFAULTS {
        Weight::Defaults
    } else if has_key(section, "composite-datasources") {
        Weight::Composite
    } else if has_key(section, "relay-source") || has_key(section, "master-dataservice") {
        Weight::Relay
    } else {
        Weight::Service
    }
}

fn value_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(value_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Parse fragment text into requests, sorted by weight and then by table name.
pub fn parse_fragments(text: &str) -> Result<Vec<Fragment>> {
    let tables: BTreeMap<String, Section> = toml::from_str(text)?;

    let mut fragments: Vec<Fragment> = tables
        .into_iter()
        .map(|(name, section)| {
            let weight = weight(&name, &section);
            let (target, hosts) = match name.split_once('@') {
                Some((target, hosts)) => (target.to_string(), split_list(hosts)),
                None => (name.clone(), Vec::new()),
            };
            let settings = section
                .iter()
                .map(|(key, value)| Setting::from_pair(key, value_string(value)))
                .collect();
            Fragment {
                name,
                weight,
                request: ConfigureRequest {
                    target,
                    hosts,
                    reset: false,
                    settings,
                },
            }
        })
        .collect();

    fragments.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));
    Ok(fragments)
}

pub fn load_fragments(path: &Path) -> Result<Vec<Fragment>> {
    let text =
        fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
    parse_fragments(&text)
}

/// Apply every fragment in order.
pub fn apply_fragments(
    cluster: &mut Cluster,
    fragments: &[Fragment],
    report: &mut Report,
) -> Result<()> {
    for fragment in fragments {
        debug!(
            "applying fragment [{}] with weight {:?}",
            fragment.name, fragment.weight
        );
        cluster.configure(&fragment.request, report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_sort_by_specificity() {
        let fragments = parse_fragments(
            r#"
            ["beta@db9"]
            thl-port = 2114

            [gamma]
            composite-datasources = ["alpha", "beta"]

            [beta]
            relay-source = "alpha"

            [alpha]
            members = "db1,db2"

            [defaults]
            datasource-user = "tungsten"
            "#,
        )
        .unwrap();

        let order: Vec<&str> = fragments.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["defaults", "alpha", "beta", "gamma", "beta@db9"]);
        assert_eq!(fragments[4].request.target, "beta");
        assert_eq!(fragments[4].request.hosts, vec!["db9"]);
        assert_eq!(
            fragments[3].request.settings,
            vec![Setting::set("composite-datasources", "alpha,beta")]
        );
        assert_eq!(
            fragments[4].request.settings,
            vec![Setting::set("thl-port", "2114")]
        );
    }

    #[test]
    fn list_operations_survive() {
        let fragments = parse_fragments("[alpha]\n\"members+\" = \"db4\"\n").unwrap();
        assert_eq!(
            fragments[0].request.settings,
            vec![Setting::new(
                "members",
                crate::settings::SettingOp::Append,
                "db4"
            )]
        );
    }
}
