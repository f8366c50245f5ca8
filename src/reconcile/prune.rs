// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Reduce a configuration tree to its minimal canonical form. Running the pruner on its own
//! output changes nothing.

use std::collections::BTreeSet;

use log::debug;
use serde_json::{Map, Value};

use crate::{
    group::{to_alias, Group, DEFAULTS, DEPLOYMENT_DATASERVICE, DEPLOYMENT_HOST},
    resolve::host_dataservice,
    store::{value_to_string, PropertyStore},
    topology::Topology,
};

/// Fields that identify an entity and are never compared against defaults.
const STRUCTURAL: &[&str] = &[DEPLOYMENT_DATASERVICE, DEPLOYMENT_HOST, "host"];

/// What `clean_cluster_configuration` removed, mostly for logging and tests.
#[derive(Debug, Default, PartialEq)]
pub struct PruneSummary {
    pub default_values: usize,
    pub option_bags: usize,
    pub services: Vec<String>,
    pub hosts: Vec<String>,
}

impl PruneSummary {
    pub fn is_empty(&self) -> bool {
        self.default_values == 0
            && self.option_bags == 0
            && self.services.is_empty()
            && self.hosts.is_empty()
    }
}

/// Prune until nothing changes. Orphans go first so that no leaf is kept on account of an
/// option bag that is itself about to disappear.
pub fn clean_cluster_configuration(store: &mut PropertyStore) -> PruneSummary {
    let mut summary = PruneSummary::default();
    loop {
        let option_bags = remove_orphan_option_bags(store);
        let services = remove_orphan_services(store);
        let hosts = remove_orphan_hosts(store);
        let default_values = remove_default_values(store);
        remove_empty_sections(store);

        let changed = option_bags + services.len() + hosts.len() + default_values > 0;
        summary.option_bags += option_bags;
        summary.services.extend(services);
        summary.hosts.extend(hosts);
        summary.default_values += default_values;
        if !changed {
            break;
        }
    }
    if !summary.is_empty() {
        debug!("pruned configuration: {summary:?}");
    }
    summary
}

fn dataservices(store: &PropertyStore) -> BTreeSet<String> {
    store
        .keys(&[Group::Dataservices.key()])
        .into_iter()
        .filter(|ds| ds != DEFAULTS)
        .collect()
}

/// Option bag fields that sit between an entry of `group` and the group defaults. An entry's
/// leaf shadowing one of these is not redundant even when it equals the default.
fn bag_fields(
    store: &PropertyStore,
    group: Group,
    alias: &str,
    entry: &Map<String, Value>,
) -> BTreeSet<String> {
    let Some(bag) = group.options_key() else {
        return BTreeSet::new();
    };
    let dataservice = match entry.get(DEPLOYMENT_DATASERVICE) {
        Some(ds) => Some(value_to_string(ds)),
        None if group == Group::Hosts => host_dataservice(store, alias),
        None => None,
    };
    dataservice
        .map(|ds| store.keys(&[bag, &ds]).into_iter().collect())
        .unwrap_or_default()
}

/// Drop every per-alias leaf equal to the group's `defaults` leaf.
fn remove_default_values(store: &mut PropertyStore) -> usize {
    let mut removed = 0;
    for group in Group::ALL {
        let Some(defaults) = store.get_map(&[group.key(), DEFAULTS]).cloned() else {
            continue;
        };
        let shadowed: Vec<(String, BTreeSet<String>)> = store
            .get_map(&[group.key()])
            .map(|section| {
                section
                    .iter()
                    .filter_map(|(alias, entry)| {
                        let fields = bag_fields(store, group, alias, entry.as_object()?);
                        Some((alias.clone(), fields))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let Some(section) = store.get_map_mut(&[group.key()]) else {
            continue;
        };
        for (alias, bag) in shadowed {
            if alias == DEFAULTS {
                continue;
            }
            let Some(entry) = section.get_mut(&alias).and_then(Value::as_object_mut) else {
                continue;
            };
            let before = entry.len();
            entry.retain(|field, value| {
                STRUCTURAL.contains(&field.as_str())
                    || bag.contains(field)
                    || defaults
                        .get(field)
                        .map_or(true, |d| value_to_string(d) != value_to_string(value))
            });
            removed += before - entry.len();
        }
    }
    removed
}

fn remove_orphan_option_bags(store: &mut PropertyStore) -> usize {
    let existing = dataservices(store);
    let mut removed = 0;
    for bag in Group::option_sections() {
        if let Some(section) = store.get_map_mut(&[bag]) {
            let before = section.len();
            section.retain(|ds, _| existing.contains(ds));
            removed += before - section.len();
        }
    }
    removed
}

fn is_empty_map(store: &PropertyStore, path: &[&str]) -> bool {
    store.get_map(path).is_some_and(Map::is_empty)
}

/// Drop empty `defaults` members, then empty option bag, service and host sections. Empty
/// dataservice entries stay; they declare the dataservice.
fn remove_empty_sections(store: &mut PropertyStore) {
    for group in Group::ALL {
        if is_empty_map(store, &[group.key(), DEFAULTS]) {
            store.remove(&[group.key(), DEFAULTS]);
        }
    }
    let sections = Group::option_sections()
        .into_iter()
        .chain(Group::SERVICES.iter().map(|g| g.key()))
        .chain([Group::Hosts.key()]);
    for section in sections {
        if is_empty_map(store, &[section]) {
            store.remove(&[section]);
        }
    }
}

/// Drop service entries whose dataservice is gone or no longer places that service on the
/// entry's host.
fn remove_orphan_services(store: &mut PropertyStore) -> Vec<String> {
    let existing = dataservices(store);
    let mut orphans: Vec<(Group, String)> = Vec::new();

    for group in Group::SERVICES {
        for alias in store.keys(&[group.key()]) {
            if alias == DEFAULTS {
                continue;
            }
            let ds = store.get_string(&[group.key(), &alias, DEPLOYMENT_DATASERVICE]);
            let host = store.get_string(&[group.key(), &alias, DEPLOYMENT_HOST]);
            let keep = match (ds, host) {
                (Some(ds), Some(host)) if existing.contains(&ds) => {
                    let topology = Topology::build(&ds, store);
                    let hosts = match group {
                        Group::Managers => topology.manager_hosts(),
                        Group::Connectors => topology.connectors(),
                        _ => topology.replication_hosts(),
                    };
                    hosts.iter().any(|h| to_alias(h) == host)
                }
                _ => false,
            };
            if !keep {
                orphans.push((group, alias));
            }
        }
    }

    for (group, alias) in &orphans {
        if let Some(section) = store.get_map_mut(&[group.key()]) {
            section.remove(alias);
        }
    }
    orphans
        .into_iter()
        .map(|(group, alias)| format!("{group}.{alias}"))
        .collect()
}

/// Drop host entries no service refers to.
fn remove_orphan_hosts(store: &mut PropertyStore) -> Vec<String> {
    let referenced: BTreeSet<String> = Group::SERVICES
        .iter()
        .flat_map(|g| {
            store
                .keys(&[g.key()])
                .into_iter()
                .filter_map(|alias| store.get_string(&[g.key(), &alias, DEPLOYMENT_HOST]))
                .collect::<Vec<_>>()
        })
        .collect();

    let orphans: Vec<String> = store
        .keys(&[Group::Hosts.key()])
        .into_iter()
        .filter(|alias| alias != DEFAULTS && !referenced.contains(alias))
        .collect();

    if let Some(section) = store.get_map_mut(&[Group::Hosts.key()]) {
        for alias in &orphans {
            section.remove(alias);
        }
    }
    orphans
}
