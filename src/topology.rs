// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! topology.rs
//!
//! The derived structural view of a dataservice. A topology is rebuilt from the store whenever
//! it is needed and never persisted; building one only reads the store.
//!
//! Structural fields are read from the dataservice itself, falling back to the dataservices
//! `defaults` member, so that pruning default-equal values never changes a topology.

use std::fmt;

use crate::{
    group::{to_alias, Group, DEFAULTS},
    store::PropertyStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    /// A managed cluster with connectors and a single master.
    Clustered,
    /// Plain replication without management.
    MasterSlave,
    /// Members extract directly from a master database that is not a member.
    Direct,
    /// Several masters replicating through a hub.
    Star,
    /// A dataservice replicating from another dataservice through a relay.
    ClusterSlave,
    /// A dataservice made up of other dataservices.
    Composite,
}

impl TopologyKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "clustered" => TopologyKind::Clustered,
            "master-slave" => TopologyKind::MasterSlave,
            "direct" => TopologyKind::Direct,
            "star" => TopologyKind::Star,
            "cluster-slave" => TopologyKind::ClusterSlave,
            "composite" => TopologyKind::Composite,
            _ => return None,
        })
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TopologyKind::Clustered => "clustered",
                TopologyKind::MasterSlave => "master-slave",
                TopologyKind::Direct => "direct",
                TopologyKind::Star => "star",
                TopologyKind::ClusterSlave => "cluster-slave",
                TopologyKind::Composite => "composite",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
    Relay,
    Direct,
    /// An active witness runs a manager but no replicator.
    Witness,
}

impl Role {
    /// Whether a host with this role runs a replication service.
    pub fn replicates(&self) -> bool {
        !matches!(self, Role::Witness)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Role::Master => "master",
                Role::Slave => "slave",
                Role::Relay => "relay",
                Role::Direct => "direct",
                Role::Witness => "witness",
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Topology {
    pub dataservice: String,
    pub kind: TopologyKind,
    /// Hostnames.
    pub members: Vec<String>,
    pub masters: Vec<String>,
    pub slaves: Vec<String>,
    pub witnesses: Vec<String>,
    pub active_witnesses: bool,
    pub relay_source: Option<String>,
    pub hub: Option<String>,
    explicit_connectors: Option<Vec<String>>,
    pub constituents: Vec<Topology>,
}

/// A structural field of a dataservice, falling back to the dataservices defaults.
fn field(store: &PropertyStore, ds: &str, name: &str) -> Option<String> {
    let g = Group::Dataservices.key();
    store
        .get_string(&[g, ds, name])
        .or_else(|| store.get_string(&[g, DEFAULTS, name]))
        .filter(|v| !v.is_empty())
}

fn list_field(store: &PropertyStore, ds: &str, name: &str) -> Option<Vec<String>> {
    field(store, ds, name).map(|v| crate::store::split_list(&v))
}

fn contains_host(hosts: &[String], alias: &str) -> bool {
    hosts.iter().any(|h| to_alias(h) == alias)
}

fn union(lists: &[&[String]]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for list in lists {
        for item in list.iter() {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
    }
    out
}

impl Topology {
    pub fn build(dataservice: &str, store: &PropertyStore) -> Self {
        Self::build_inner(dataservice, store, &mut Vec::new())
    }

    fn build_inner(ds: &str, store: &PropertyStore, visiting: &mut Vec<String>) -> Self {
        visiting.push(ds.to_string());

        let composite = list_field(store, ds, "composite_datasources").unwrap_or_default();
        let relay_source = field(store, ds, "relay_source");
        let kind = field(store, ds, "topology")
            .and_then(|t| TopologyKind::parse(&t))
            .unwrap_or(if !composite.is_empty() {
                TopologyKind::Composite
            } else if relay_source.is_some() {
                TopologyKind::ClusterSlave
            } else {
                TopologyKind::Clustered
            });

        // A dataservice listing itself (directly or through another composite) is skipped
        // rather than recursed into.
        let constituents: Vec<Topology> = if kind == TopologyKind::Composite {
            let mut built = Vec::new();
            for c in composite.iter() {
                if !visiting.contains(c) {
                    built.push(Self::build_inner(c, store, visiting));
                }
            }
            built
        } else {
            Vec::new()
        };

        let masters = list_field(store, ds, "master_host").unwrap_or_default();
        let witnesses = list_field(store, ds, "witnesses").unwrap_or_default();
        let explicit_slaves = list_field(store, ds, "slaves");

        let members = match list_field(store, ds, "members") {
            Some(members) => members,
            None => match kind {
                TopologyKind::Composite => {
                    let lists: Vec<&[String]> =
                        constituents.iter().map(|c| c.members.as_slice()).collect();
                    union(&lists)
                }
                TopologyKind::Direct => explicit_slaves.clone().unwrap_or_default(),
                _ => union(&[&masters, explicit_slaves.as_deref().unwrap_or(&[])]),
            },
        };

        let slaves = match explicit_slaves {
            Some(slaves) => slaves,
            None => members
                .iter()
                .filter(|m| !masters.contains(m) && !witnesses.contains(m))
                .cloned()
                .collect(),
        };

        let active_witnesses = field(store, ds, "enable_active_witnesses")
            .map(|v| matches!(v.as_str(), "true" | "yes" | "1" | "on"))
            .unwrap_or(false);

        visiting.pop();

        Topology {
            dataservice: ds.to_string(),
            kind,
            members,
            masters,
            slaves,
            witnesses,
            active_witnesses,
            relay_source,
            hub: field(store, ds, "hub"),
            explicit_connectors: list_field(store, ds, "connectors"),
            constituents,
        }
    }

    pub fn use_management(&self) -> bool {
        matches!(self.kind, TopologyKind::Clustered | TopologyKind::Composite)
    }

    pub fn use_connector(&self) -> bool {
        matches!(self.kind, TopologyKind::Clustered | TopologyKind::Composite)
    }

    pub fn use_replicator(&self) -> bool {
        self.kind != TopologyKind::Composite
    }

    pub fn allow_multiple_masters(&self) -> bool {
        self.kind == TopologyKind::Star
    }

    pub fn disable_relay_logs(&self) -> bool {
        self.kind != TopologyKind::Direct
    }

    pub fn master_preferred_role(&self) -> Role {
        match self.kind {
            TopologyKind::Direct => Role::Direct,
            TopologyKind::ClusterSlave => Role::Relay,
            _ => Role::Master,
        }
    }

    pub fn is_member(&self, host_alias: &str) -> bool {
        contains_host(&self.members, host_alias)
    }

    /// The role of a host in this dataservice, or `None` if it takes no part.
    pub fn get_role(&self, host_alias: &str) -> Option<Role> {
        if self.kind == TopologyKind::Composite {
            return self
                .constituents
                .iter()
                .find_map(|c| c.get_role(host_alias));
        }

        if !self.is_member(host_alias) {
            if contains_host(&self.witnesses, host_alias)
                && self.active_witnesses
                && self.use_management()
            {
                return Some(Role::Witness);
            }
            return None;
        }

        match self.kind {
            TopologyKind::Direct => Some(Role::Direct),
            _ if contains_host(&self.masters, host_alias) => Some(self.master_preferred_role()),
            TopologyKind::Star
                if self.hub.as_deref().map(to_alias).as_deref() == Some(host_alias) =>
            {
                Some(Role::Master)
            }
            _ if contains_host(&self.slaves, host_alias) => Some(Role::Slave),
            // Members that are neither listed masters nor listed slaves, e.g. when slaves was
            // given explicitly but incompletely.
            _ if contains_host(&self.witnesses, host_alias) => None,
            _ => Some(Role::Slave),
        }
    }

    /// Hostnames that run a replication service for this dataservice.
    pub fn replication_hosts(&self) -> Vec<String> {
        if !self.use_replicator() {
            return Vec::new();
        }
        self.members
            .iter()
            .filter(|h| {
                self.get_role(&to_alias(h))
                    .is_some_and(|r| r.replicates())
            })
            .cloned()
            .collect()
    }

    /// Hostnames that run a manager for this dataservice. Composite dataservices are managed
    /// through their constituents.
    pub fn manager_hosts(&self) -> Vec<String> {
        if !self.use_management() || self.kind == TopologyKind::Composite {
            return Vec::new();
        }
        let mut hosts: Vec<String> = self
            .members
            .iter()
            .filter(|h| self.get_role(&to_alias(h)).is_some())
            .cloned()
            .collect();
        if self.active_witnesses {
            for w in &self.witnesses {
                if !hosts.contains(w) {
                    hosts.push(w.clone());
                }
            }
        }
        hosts
    }

    /// Hostnames that run a connector for this dataservice.
    pub fn connectors(&self) -> Vec<String> {
        if !self.use_connector() {
            return Vec::new();
        }
        match &self.explicit_connectors {
            Some(connectors) => connectors.clone(),
            None if self.kind == TopologyKind::Composite => Vec::new(),
            None => self.replication_hosts(),
        }
    }

    /// Every host alias that takes part in this dataservice in any way.
    pub fn host_aliases(&self) -> Vec<String> {
        let mut out = Vec::new();
        for h in self
            .replication_hosts()
            .iter()
            .chain(self.manager_hosts().iter())
            .chain(self.connectors().iter())
        {
            let alias = to_alias(h);
            if !out.contains(&alias) {
                out.push(alias);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(v: serde_json::Value) -> PropertyStore {
        PropertyStore::from_value(json!({ "dataservices": v })).unwrap()
    }

    #[test]
    fn clustered_roles() {
        let s = store(json!({"alpha": {"members": "h1,h2,h3", "master_host": "h1"}}));
        let t = Topology::build("alpha", &s);
        assert_eq!(t.kind, TopologyKind::Clustered);
        assert_eq!(t.get_role("h1"), Some(Role::Master));
        assert_eq!(t.get_role("h2"), Some(Role::Slave));
        assert_eq!(t.get_role("h9"), None);
        assert_eq!(t.slaves, vec!["h2", "h3"]);
        assert!(t.use_management() && t.use_connector());
    }

    #[test]
    fn members_default_to_masters_and_slaves() {
        let s = store(json!({"alpha": {"master_host": "h1", "slaves": "h2"}}));
        assert_eq!(Topology::build("alpha", &s).members, vec!["h1", "h2"]);
    }

    #[test]
    fn passive_witness_is_not_a_member() {
        let s = store(json!({"alpha": {"members": "h1,h2", "master_host": "h1", "witnesses": "w1"}}));
        let t = Topology::build("alpha", &s);
        assert_eq!(t.get_role("w1"), None);
        assert!(!t.manager_hosts().contains(&"w1".to_string()));

        let s = store(json!({"alpha": {"members": "h1,h2", "master_host": "h1",
            "witnesses": "w1", "enable_active_witnesses": "true"}}));
        let t = Topology::build("alpha", &s);
        assert_eq!(t.get_role("w1"), Some(Role::Witness));
        assert!(t.manager_hosts().contains(&"w1".to_string()));
        assert!(!t.replication_hosts().contains(&"w1".to_string()));
    }

    #[test]
    fn composite_delegates_roles() {
        let s = store(json!({
            "east": {"members": "e1,e2", "master_host": "e1"},
            "west": {"members": "w1,w2", "master_host": "w1", "relay_source": "east"},
            "global": {"composite_datasources": "east,west"}
        }));
        let t = Topology::build("global", &s);
        assert_eq!(t.kind, TopologyKind::Composite);
        assert!(!t.use_replicator());
        assert_eq!(t.get_role("e1"), Some(Role::Master));
        assert_eq!(t.get_role("w1"), Some(Role::Relay));
        assert_eq!(t.get_role("w2"), Some(Role::Slave));
        assert_eq!(t.members, vec!["e1", "e2", "w1", "w2"]);
    }

    #[test]
    fn self_referencing_composite_terminates() {
        let s = store(json!({"loop": {"composite_datasources": "loop"}}));
        let t = Topology::build("loop", &s);
        assert!(t.constituents.is_empty());
    }

    #[test]
    fn direct_members_extract_from_remote_master() {
        let s = store(json!({"d": {"topology": "direct", "members": "s1", "master_host": "db0"}}));
        let t = Topology::build("d", &s);
        assert_eq!(t.get_role("s1"), Some(Role::Direct));
        assert_eq!(t.get_role("db0"), None);
        assert!(!t.disable_relay_logs());
    }
}
