// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::fmt;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::{
    error::{Issue, IssueKind, Report, Severity},
    group::{Group, DEFAULTS},
    store::{value_to_string, PropertyStore},
};

use super::prune::{clean_cluster_configuration, PruneSummary};

/// Two reached hosts disagree on one leaf of a shared section.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// `section.alias`, e.g. `dataservices.svc1`.
    pub section: String,
    pub key: String,
    pub anchor: String,
    pub anchor_value: String,
    pub other: String,
    pub other_value: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} is '{}' on {} but '{}' on {}",
            self.section, self.key, self.anchor_value, self.anchor, self.other_value, self.other
        )
    }
}

impl Conflict {
    fn to_issue(&self) -> Issue {
        Issue {
            severity: Severity::Error,
            kind: IssueKind::Conflict,
            host: Some(self.other.clone()),
            alias: None,
            subject: format!("{}.{}", self.section, self.key),
            message: format!(
                "{} has '{}' but {} has '{}'; rerun with --default-host to pick one",
                self.anchor, self.anchor_value, self.other, self.other_value
            ),
        }
    }
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub store: PropertyStore,
    pub anchor: Option<String>,
    pub conflicts: Vec<Conflict>,
    pub pruned: PruneSummary,
}

/// Copy every entry of `source` into `merged`, recording leaves that already hold a different
/// value. The `defaults` members are left out; `fold_defaults` deals with them.
fn merge_source(
    merged: &mut PropertyStore,
    anchor: &str,
    host: &str,
    source: &PropertyStore,
    conflicts: &mut Vec<Conflict>,
) {
    for section in Group::sections() {
        let Some(entries) = source.get_map(&[section]) else {
            continue;
        };
        for (alias, entry) in entries {
            if alias == DEFAULTS {
                continue;
            }
            let Some(fields) = entry.as_object() else {
                continue;
            };
            if fields.is_empty() && !merged.contains(&[section, alias]) {
                merged.set(&[section, alias], Value::Object(Map::new()));
            }
            for (key, value) in fields {
                let path = [section, alias.as_str(), key.as_str()];
                match merged.get(&path) {
                    None => merged.set(&path, value.clone()),
                    Some(existing) if value_to_string(existing) != value_to_string(value) => {
                        conflicts.push(Conflict {
                            section: format!("{section}.{alias}"),
                            key: key.clone(),
                            anchor: anchor.to_string(),
                            anchor_value: value_to_string(existing),
                            other: host.to_string(),
                            other_value: value_to_string(value),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

/// Fold the remote `defaults` of each host-bound group into the option bags of the remote's
/// dataservices wherever they differ from the local defaults, so that they keep applying once
/// the local defaults take over. Bag values already present are never overwritten.
fn fold_defaults(merged: &mut PropertyStore, local: &PropertyStore, source: &PropertyStore) {
    let dataservices: Vec<String> = source
        .keys(&[Group::Dataservices.key()])
        .into_iter()
        .filter(|ds| ds != DEFAULTS)
        .collect();

    for group in Group::ALL {
        let Some(remote_defaults) = source.get_map(&[group.key(), DEFAULTS]) else {
            continue;
        };
        let Some(bag) = group.options_key() else {
            // Dataservice defaults have no bag; keep the remote ones the local side lacks.
            merged.include(&[group.key(), DEFAULTS], remote_defaults);
            continue;
        };
        for (key, value) in remote_defaults {
            let local_value = local.get_string(&[group.key(), DEFAULTS, key]);
            if local_value.as_deref() == Some(value_to_string(value).as_str()) {
                continue;
            }
            for ds in &dataservices {
                let path = [bag, ds.as_str(), key.as_str()];
                if !merged.contains(&path) {
                    debug!("folding {}.defaults.{key} into {bag}.{ds}", group.key());
                    merged.set(&path, value.clone());
                }
            }
        }
    }
}

/// Merge the configurations reached on several hosts. `sources` is in target order; the
/// anchor is `default_host` when given, otherwise the first source. Conflicts are recorded
/// into `report` unless the anchor was chosen explicitly, in which case it silently wins.
pub fn merge(
    local: &PropertyStore,
    sources: &[(String, PropertyStore)],
    default_host: Option<&str>,
    report: &mut Report,
) -> MergeOutcome {
    let anchor = default_host
        .map(str::to_string)
        .or_else(|| sources.first().map(|(host, _)| host.clone()));

    let Some(anchor_name) = anchor.clone() else {
        let mut store = local.clone();
        let pruned = clean_cluster_configuration(&mut store);
        return MergeOutcome {
            store,
            anchor,
            conflicts: Vec::new(),
            pruned,
        };
    };

    let mut merged = PropertyStore::new();
    for group in Group::ALL {
        let defaults = local
            .get_map(&[group.key(), DEFAULTS])
            .cloned()
            .unwrap_or_default();
        merged.set(&[group.key(), DEFAULTS], Value::Object(defaults));
    }

    let mut ordered: Vec<&(String, PropertyStore)> = Vec::with_capacity(sources.len());
    ordered.extend(sources.iter().filter(|(host, _)| *host == anchor_name));
    ordered.extend(sources.iter().filter(|(host, _)| *host != anchor_name));

    let mut conflicts = Vec::new();
    for (host, source) in &ordered {
        merge_source(&mut merged, &anchor_name, host, source, &mut conflicts);
    }
    for (_, source) in &ordered {
        fold_defaults(&mut merged, local, source);
    }

    if default_host.is_some() {
        if !conflicts.is_empty() {
            info!(
                "{} conflicting value(s) resolved in favour of {anchor_name}",
                conflicts.len()
            );
        }
    } else {
        for conflict in &conflicts {
            report.record(conflict.to_issue());
        }
    }

    let pruned = clean_cluster_configuration(&mut merged);
    MergeOutcome {
        store: merged,
        anchor,
        conflicts,
        pruned,
    }
}
