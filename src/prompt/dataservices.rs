// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Structural prompts of a dataservice. Most of these are read by the topology deriver, so
//! their defaults come from the topology rather than from other prompts.

use crate::{
    error::Result,
    group::{Group, Member},
    resolve::Resolver,
    topology::TopologyKind,
};

use super::{Prompt, PromptRegistry, Validator};

pub const TOPOLOGIES: &[&str] = &[
    "clustered",
    "master-slave",
    "direct",
    "star",
    "cluster-slave",
    "composite",
];

fn kind(r: &Resolver, m: &Member) -> TopologyKind {
    r.topology(&m.alias).kind
}

fn uses_replicator(r: &Resolver, m: &Member) -> Result<bool> {
    Ok(r.topology(&m.alias).use_replicator())
}

fn uses_management(r: &Resolver, m: &Member) -> Result<bool> {
    Ok(r.topology(&m.alias).use_management())
}

fn uses_connector(r: &Resolver, m: &Member) -> Result<bool> {
    Ok(r.topology(&m.alias).use_connector())
}

fn is_star(r: &Resolver, m: &Member) -> Result<bool> {
    Ok(kind(r, m) == TopologyKind::Star)
}

fn has_vip(r: &Resolver, m: &Member) -> Result<bool> {
    Ok(!r.value(m, "vip_address")?.is_empty())
}

fn default_members(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(r.topology(&m.alias).members.join(",")))
}

fn default_slaves(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(r.topology(&m.alias).slaves.join(",")))
}

fn default_topology(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(kind(r, m).to_string()))
}

fn default_connectors(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(r.topology(&m.alias).connectors().join(",")))
}

fn default_hub_service(_r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(format!("{}_from_hub", m.alias)))
}

pub fn register(registry: &mut PromptRegistry) {
    let g = Group::Dataservices;

    registry.register(
        Prompt::new(g, "members", Validator::HostList)
            .describe("Hostnames of the dataservice members")
            .alias("--dataservice-hosts")
            .default_fn(default_members),
    );
    registry.register(
        Prompt::new(g, "master_host", Validator::HostList)
            .describe("Hostname of the master, or of every master when several are allowed")
            .flag("--master")
            .alias("--masters")
            .alias("--dataservice-master-host")
            .required_if(uses_replicator),
    );
    registry.register(
        Prompt::new(g, "slaves", Validator::HostList)
            .describe("Hostnames of the slaves")
            .alias("--dataservice-slaves")
            .default_fn(default_slaves),
    );
    registry.register(
        Prompt::new(g, "witnesses", Validator::HostList)
            .describe("Witness hosts used to settle network partitions")
            .alias("--dataservice-witnesses")
            .enabled_if(uses_management),
    );
    registry.register(
        Prompt::new(g, "enable_active_witnesses", Validator::Boolean)
            .describe("Run a manager on every witness host")
            .alias("--active-witnesses")
            .enabled_if(uses_management)
            .default_value("false")
            .disabled_value("false"),
    );
    registry.register(
        Prompt::new(g, "composite_datasources", Validator::List)
            .describe("Dataservices that make up this composite dataservice")
            .alias("--dataservice-composite-datasources"),
    );
    registry.register(
        Prompt::new(g, "topology", Validator::Choice(TOPOLOGIES))
            .describe("Replication topology of the dataservice")
            .alias("--dataservice-topology")
            .default_fn(default_topology),
    );
    registry.register(
        Prompt::new(g, "relay_source", Validator::Identifier)
            .describe("Dataservice this one relays from")
            .alias("--master-dataservice")
            .alias("--dataservice-relay-source"),
    );
    registry.register(
        Prompt::new(g, "hub", Validator::Hostname)
            .describe("Hub host of a star topology")
            .alias("--dataservice-hub-host")
            .enabled_if(is_star)
            .required_if(is_star),
    );
    registry.register(
        Prompt::new(g, "hub_service", Validator::Identifier)
            .describe("Service name used by the hub of a star topology")
            .alias("--dataservice-hub-service")
            .enabled_if(is_star)
            .default_fn(default_hub_service),
    );
    registry.register(
        Prompt::new(g, "connectors", Validator::HostList)
            .describe("Hostnames that run a connector for this dataservice")
            .alias("--dataservice-connectors")
            .enabled_if(uses_connector)
            .default_fn(default_connectors),
    );
    registry.register(
        Prompt::new(g, "vip_address", Validator::IpAddress)
            .describe("Virtual IP that follows the master")
            .alias("--dataservice-vip-ipaddress")
            .enabled_if(uses_management),
    );
    registry.register(
        Prompt::new(g, "vip_netmask", Validator::IpAddress)
            .describe("Netmask of the virtual IP")
            .alias("--dataservice-vip-netmask")
            .enabled_if(has_vip)
            .required_if(has_vip),
    );
    registry.register(
        Prompt::new(g, "dataservice_skip_validation_check", Validator::List)
            .describe("Validation checks to skip for this dataservice"),
    );
    registry.register(
        Prompt::new(g, "dataservice_enable_validation_check", Validator::List)
            .describe("Validation checks to run for this dataservice even if skipped"),
    );
    registry.register(
        Prompt::new(g, "dataservice_skip_validation_warnings", Validator::List)
            .describe("Validation checks whose warnings are suppressed for this dataservice"),
    );
    registry.register(
        Prompt::new(g, "dataservice_enable_validation_warnings", Validator::List)
            .describe("Validation checks whose warnings are shown for this dataservice"),
    );
}
