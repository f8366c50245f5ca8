// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Older installations persist a flat, single-service document such as
//! `{"service_name": "alpha", "role": "slave", "master_host": "db1", "host": "db2", ...}`.
//! These are rebuilt into a grouped tree before they take part in a merge.

use std::collections::BTreeMap;

use log::debug;
use serde_json::{Map, Value};

use crate::{
    error::Report,
    group::{to_alias, service_alias, Group, DEPLOYMENT_DATASERVICE, DEPLOYMENT_HOST},
    store::{value_to_string, PropertyStore},
};

/// Flat keys that describe structure rather than replication settings.
const STRUCTURE_KEYS: &[&str] = &["service_name", "role", "master_host", "host"];

/// A configuration is legacy when none of the group sections are present.
pub fn is_legacy(document: &Map<String, Value>) -> bool {
    !document.is_empty()
        && !Group::sections()
            .iter()
            .any(|section| document.contains_key(*section))
}

#[derive(Default)]
struct LegacyService {
    members: Vec<String>,
    masters: Vec<String>,
    direct: bool,
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !item.is_empty() && !list.iter().any(|i| i == item) {
        list.push(item.to_string());
    }
}

/// Turn every legacy response into one grouped tree. `documents` pairs the host that was
/// asked with its flat document.
pub fn migrate_legacy(documents: &[(String, Map<String, Value>)], report: &mut Report) -> PropertyStore {
    let mut services: BTreeMap<String, LegacyService> = BTreeMap::new();
    let mut store = PropertyStore::new();

    for (fetched_from, flat) in documents {
        let text = |key: &str| flat.get(key).map(value_to_string).unwrap_or_default();

        let service = text("service_name");
        if service.is_empty() {
            report.warning(
                format!("{fetched_from}.service_name"),
                "legacy configuration has no service name and was ignored",
            );
            continue;
        }
        let host = match text("host") {
            h if h.is_empty() => fetched_from.clone(),
            h => h,
        };
        let role = text("role");
        debug!("migrating legacy configuration of {host}: {service} ({role})");

        let entry = services.entry(service.clone()).or_default();
        push_unique(&mut entry.members, &host);
        match role.as_str() {
            "master" => push_unique(&mut entry.masters, &host),
            "direct" => entry.direct = true,
            _ => {}
        }
        if role != "master" {
            let upstream = text("master_host");
            if entry.masters.is_empty() || entry.direct {
                push_unique(&mut entry.masters, &upstream);
            }
        }

        let rs = Group::ReplicationServices.key();
        let alias = service_alias(&service, &host);
        store.set(&[rs, &alias, DEPLOYMENT_DATASERVICE], service.as_str());
        store.set(&[rs, &alias, DEPLOYMENT_HOST], to_alias(&host));
        for (key, value) in flat {
            if !STRUCTURE_KEYS.contains(&key.as_str()) && !value.is_object() {
                store.set(&[rs, &alias, key], value_to_string(value));
            }
        }
        store.set(&[Group::Hosts.key(), &to_alias(&host), "host"], host.as_str());
    }

    let ds = Group::Dataservices.key();
    for (name, service) in services {
        // A master seen in person replaces any upstream guessed from a slave.
        let masters: Vec<String> = if service.direct {
            service.masters
        } else {
            let seen: Vec<String> = service
                .masters
                .iter()
                .filter(|m| service.members.contains(m))
                .cloned()
                .collect();
            if seen.is_empty() {
                service.masters
            } else {
                seen
            }
        };
        let topology = if service.direct { "direct" } else { "master-slave" };
        let members = if service.direct {
            service
                .members
                .iter()
                .filter(|m| !masters.contains(m))
                .cloned()
                .collect::<Vec<_>>()
        } else {
            service.members
        };

        store.set(&[ds, &name, "members"], members.join(","));
        store.set(&[ds, &name, "master_host"], masters.join(","));
        store.set(&[ds, &name, "topology"], topology);
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn detects_flat_documents() {
        assert!(is_legacy(&doc(json!({"service_name": "alpha"}))));
        assert!(!is_legacy(&doc(json!({"dataservices": {}}))));
        assert!(!is_legacy(&Map::new()));
    }

    #[test]
    fn flat_documents_become_one_dataservice() {
        let mut report = Report::new();
        let store = migrate_legacy(
            &[
                (
                    "db1".to_string(),
                    doc(json!({"service_name": "alpha", "role": "master", "host": "db1",
                        "thl_port": 2112})),
                ),
                (
                    "db2".to_string(),
                    doc(json!({"service_name": "alpha", "role": "slave", "master_host": "db1"})),
                ),
            ],
            &mut report,
        );
        assert!(!report.has_errors());
        assert_eq!(
            store.get_string(&["dataservices", "alpha", "members"]).unwrap(),
            "db1,db2"
        );
        assert_eq!(
            store.get_string(&["dataservices", "alpha", "master_host"]).unwrap(),
            "db1"
        );
        assert_eq!(
            store.get_string(&["dataservices", "alpha", "topology"]).unwrap(),
            "master-slave"
        );
        assert_eq!(
            store.get_string(&["repl_services", "alpha_db1", "thl_port"]).unwrap(),
            "2112"
        );
        assert_eq!(
            store.get_string(&["repl_services", "alpha_db2", "deployment_host"]).unwrap(),
            "db2"
        );
        assert!(!store.contains(&["repl_services", "alpha_db2", "role"]));
    }

    #[test]
    fn direct_role_sets_direct_topology() {
        let mut report = Report::new();
        let store = migrate_legacy(
            &[(
                "ext1".to_string(),
                doc(json!({"service_name": "beta", "role": "direct", "master_host": "src1"})),
            )],
            &mut report,
        );
        assert_eq!(
            store.get_string(&["dataservices", "beta", "topology"]).unwrap(),
            "direct"
        );
        assert_eq!(
            store.get_string(&["dataservices", "beta", "master_host"]).unwrap(),
            "src1"
        );
        assert_eq!(
            store.get_string(&["dataservices", "beta", "members"]).unwrap(),
            "ext1"
        );
    }
}
