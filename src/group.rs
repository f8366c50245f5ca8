// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::fmt;

/// Key of the pseudo-member that holds group-wide defaults.
pub const DEFAULTS: &str = "defaults";

/// Structural field naming the dataservice a service entity belongs to.
pub const DEPLOYMENT_DATASERVICE: &str = "deployment_dataservice";

/// Structural field naming the host alias a service entity runs on.
pub const DEPLOYMENT_HOST: &str = "deployment_host";

/// The entity groups of a configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    Hosts,
    Dataservices,
    Managers,
    Connectors,
    ReplicationServices,
}

impl Group {
    pub const ALL: [Group; 5] = [
        Group::Dataservices,
        Group::Hosts,
        Group::Managers,
        Group::Connectors,
        Group::ReplicationServices,
    ];

    /// The service groups, whose members are bound to a (dataservice, host) pair.
    pub const SERVICES: [Group; 3] = [
        Group::Managers,
        Group::Connectors,
        Group::ReplicationServices,
    ];

    /// The section name of this group in the configuration tree.
    pub fn key(&self) -> &'static str {
        match self {
            Group::Hosts => "hosts",
            Group::Dataservices => "dataservices",
            Group::Managers => "managers",
            Group::Connectors => "connectors",
            Group::ReplicationServices => "repl_services",
        }
    }

    /// The per-dataservice option bag section for this group. Dataservices have none.
    pub fn options_key(&self) -> Option<&'static str> {
        match self {
            Group::Hosts => Some("dataservice_host_options"),
            Group::Dataservices => None,
            Group::Managers => Some("dataservice_manager_options"),
            Group::Connectors => Some("dataservice_connector_options"),
            Group::ReplicationServices => Some("dataservice_replication_options"),
        }
    }

    pub fn from_key(key: &str) -> Option<Group> {
        Group::ALL.into_iter().find(|g| g.key() == key)
    }

    pub fn is_service(&self) -> bool {
        Group::SERVICES.contains(self)
    }

    /// All top-level sections that reconciliation treats as group sections: the entity groups
    /// followed by the option bags.
    pub fn sections() -> Vec<&'static str> {
        let mut sections: Vec<&'static str> = Group::ALL.iter().map(|g| g.key()).collect();
        sections.extend(Group::ALL.iter().filter_map(|g| g.options_key()));
        sections
    }

    pub fn option_sections() -> Vec<&'static str> {
        Group::ALL.iter().filter_map(|g| g.options_key()).collect()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Turn a hostname or service name into an alias: every character that is not ASCII
/// alphanumeric becomes `_`.
pub fn to_alias(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// The alias of a service entity for `dataservice` on `host`.
pub fn service_alias(dataservice: &str, host: &str) -> String {
    format!("{}_{}", to_alias(dataservice), to_alias(host))
}

/// One member of one group. `alias` may be `DEFAULTS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Member {
    pub group: Group,
    pub alias: String,
}

impl Member {
    pub fn new(group: Group, alias: impl Into<String>) -> Self {
        Member {
            group,
            alias: alias.into(),
        }
    }

    pub fn host(alias: impl Into<String>) -> Self {
        Self::new(Group::Hosts, alias)
    }

    pub fn dataservice(alias: impl Into<String>) -> Self {
        Self::new(Group::Dataservices, alias)
    }

    pub fn defaults(group: Group) -> Self {
        Self::new(group, DEFAULTS)
    }

    pub fn is_defaults(&self) -> bool {
        self.alias == DEFAULTS
    }

    /// The store path of `field` for this member.
    pub fn path<'a>(&'a self, field: &'a str) -> [&'a str; 3] {
        [self.group.key(), self.alias.as_str(), field]
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.alias)
    }
}
