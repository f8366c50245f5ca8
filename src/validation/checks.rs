// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use crate::{
    error::Result,
    group::{to_alias, Group, Member},
    topology::{Topology, TopologyKind},
};

use super::{Check, CheckContext, CheckRegistry, Scope, Target};

pub fn register(registry: &mut CheckRegistry) {
    registry.register(Box::new(RequiredPromptsCheck));
    registry.register(Box::new(MasterInMembersCheck));
    registry.register(Box::new(WitnessNotMemberCheck));
    registry.register(Box::new(CompositeDatasourcesCheck));
    registry.register(Box::new(PortConflictCheck));
    registry.register(Box::new(HostnameFormatCheck));
    registry.register(Box::new(VipConfigurationCheck));

    registry.register(Box::new(SshLoginCheck));
    registry.register(Box::new(TempDirectoryWritableCheck));
    registry.register(Box::new(HostAddressCheck));
    registry.register(Box::new(ManagerPingMethodCheck));

    registry.register(Box::new(ConsistentAddressesCheck));
    registry.register(Box::new(ConsistentPingMethodCheck));

    registry.register(Box::new(ReleaseDirectoryCheck));
}

fn topology(ctx: &CheckContext) -> Option<std::rc::Rc<Topology>> {
    let member = ctx.member.as_ref()?;
    (member.group == Group::Dataservices).then(|| ctx.resolver.topology(&member.alias))
}

/// Service members of `group` that run on the host under check.
fn services_on_host(ctx: &CheckContext, group: Group) -> Vec<Member> {
    let Some(host) = ctx.member.as_ref() else {
        return Vec::new();
    };
    ctx.resolver
        .members(group)
        .into_iter()
        .filter(|m| ctx.resolver.host_of(m).as_deref() == Some(host.alias.as_str()))
        .collect()
}

pub struct RequiredPromptsCheck;

impl Check for RequiredPromptsCheck {
    fn name(&self) -> &'static str {
        "RequiredPromptsCheck"
    }

    fn title(&self) -> &'static str {
        "Required values are present"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Cluster
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        for group in Group::ALL {
            for member in ctx.resolver.members(group) {
                for issue in ctx.resolver.missing_required(&member)? {
                    ctx.record(issue);
                }
            }
        }
        Ok(())
    }
}

pub struct MasterInMembersCheck;

impl Check for MasterInMembersCheck {
    fn name(&self) -> &'static str {
        "MasterInMembersCheck"
    }

    fn title(&self) -> &'static str {
        "Masters are members of their dataservice"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Dataservice
    }

    fn enabled(&self, ctx: &CheckContext) -> Result<bool> {
        Ok(topology(ctx).is_some_and(|t| {
            !matches!(t.kind, TopologyKind::Direct | TopologyKind::Composite)
        }))
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(t) = topology(ctx) else {
            return Ok(());
        };
        for master in &t.masters {
            if !t.members.contains(master) {
                ctx.error(format!(
                    "master {master} is not a member of {}",
                    t.dataservice
                ));
            }
        }
        if t.masters.len() > 1 && !t.allow_multiple_masters() {
            ctx.error(format!(
                "{} lists {} masters but a {} dataservice allows only one",
                t.dataservice,
                t.masters.len(),
                t.kind
            ));
        }
        Ok(())
    }
}

pub struct WitnessNotMemberCheck;

impl Check for WitnessNotMemberCheck {
    fn name(&self) -> &'static str {
        "WitnessNotMemberCheck"
    }

    fn title(&self) -> &'static str {
        "Witness hosts are not dataservice members"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Dataservice
    }

    fn enabled(&self, ctx: &CheckContext) -> Result<bool> {
        Ok(topology(ctx).is_some_and(|t| t.use_management() && !t.witnesses.is_empty()))
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(t) = topology(ctx) else {
            return Ok(());
        };
        for witness in t.witnesses.iter().filter(|w| t.members.contains(w)) {
            ctx.error(format!(
                "{witness} is both a witness and a member of {}",
                t.dataservice
            ));
        }
        Ok(())
    }
}

pub struct CompositeDatasourcesCheck;

impl Check for CompositeDatasourcesCheck {
    fn name(&self) -> &'static str {
        "CompositeDatasourcesCheck"
    }

    fn title(&self) -> &'static str {
        "Composite dataservices reference existing dataservices"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Dataservice
    }

    fn enabled(&self, ctx: &CheckContext) -> Result<bool> {
        Ok(topology(ctx).is_some_and(|t| t.kind == TopologyKind::Composite))
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(member) = ctx.member.clone() else {
            return Ok(());
        };
        let existing: BTreeSet<String> = ctx
            .resolver
            .members(Group::Dataservices)
            .into_iter()
            .map(|m| m.alias)
            .collect();
        let listed = ctx.resolver.list_value(&member, "composite_datasources")?;
        if listed.is_empty() {
            ctx.error(format!("{} has no composite datasources", member.alias));
        }
        for ds in listed {
            if ds == member.alias {
                ctx.error(format!("{ds} cannot be one of its own composite datasources"));
            } else if !existing.contains(&ds) {
                ctx.error(format!("composite datasource {ds} is not defined"));
            } else if ctx.resolver.topology(&ds).kind == TopologyKind::Composite {
                ctx.error(format!("composite datasource {ds} is itself composite"));
            }
        }
        Ok(())
    }
}

pub struct PortConflictCheck;

impl Check for PortConflictCheck {
    fn name(&self) -> &'static str {
        "PortConflictCheck"
    }

    fn title(&self) -> &'static str {
        "Services on a host listen on distinct ports"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        const PORTS: &[(Group, &[&str])] = &[
            (Group::ReplicationServices, &["rmi_port", "thl_port"]),
            (Group::Managers, &["mgr_rmi_port", "mgr_listen_port"]),
            (Group::Connectors, &["conn_listen_port"]),
        ];

        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for (group, names) in PORTS {
            for member in services_on_host(ctx, *group) {
                for name in *names {
                    let port = ctx.resolver.value(&member, name)?;
                    if port.is_empty() {
                        continue;
                    }
                    let owner = format!("{member}.{name}");
                    match seen.get(&port) {
                        Some(other) => conflicts.push(format!(
                            "port {port} is used by both {other} and {owner}"
                        )),
                        None => {
                            seen.insert(port, owner);
                        }
                    }
                }
            }
        }
        for conflict in conflicts {
            ctx.error(conflict);
        }
        Ok(())
    }
}

pub struct HostnameFormatCheck;

impl Check for HostnameFormatCheck {
    fn name(&self) -> &'static str {
        "HostnameFormatCheck"
    }

    fn title(&self) -> &'static str {
        "Hostnames are well formed"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let host = ctx.host().to_string();
        if let Err(message) = crate::prompt::Validator::Hostname.coerce(&host) {
            ctx.error(message);
        } else if host.chars().any(|c| c.is_ascii_uppercase()) {
            ctx.warning(format!(
                "{host} contains uppercase letters; hostnames are compared case-sensitively"
            ));
        }
        Ok(())
    }
}

pub struct VipConfigurationCheck;

impl Check for VipConfigurationCheck {
    fn name(&self) -> &'static str {
        "VipConfigurationCheck"
    }

    fn title(&self) -> &'static str {
        "Virtual IP settings are complete"
    }

    fn scope(&self) -> Scope {
        Scope::Local
    }

    fn target(&self) -> Target {
        Target::Dataservice
    }

    fn enabled(&self, ctx: &CheckContext) -> Result<bool> {
        Ok(topology(ctx).is_some_and(|t| t.use_management()))
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(member) = ctx.member.clone() else {
            return Ok(());
        };
        if ctx.resolver.value(&member, "vip_address")?.is_empty() {
            return Ok(());
        }

        let netmask = ctx.resolver.value(&member, "vip_netmask")?;
        if !netmask.is_empty() && netmask.parse::<Ipv4Addr>().is_err() {
            ctx.error(format!("'{netmask}' is not a dotted-quad netmask"));
        }

        let managers: Vec<Member> = ctx
            .resolver
            .members(Group::Managers)
            .into_iter()
            .filter(|m| ctx.resolver.dataservice_of(m).as_deref() == Some(member.alias.as_str()))
            .collect();
        for manager in managers {
            if ctx.resolver.value(&manager, "mgr_vip_interface")?.is_empty() {
                ctx.error(format!("{manager} has no interface for the virtual IP"));
            }
        }
        Ok(())
    }
}

pub struct SshLoginCheck;

impl Check for SshLoginCheck {
    fn name(&self) -> &'static str {
        "SshLoginCheck"
    }

    fn title(&self) -> &'static str {
        "The host accepts a non-interactive login"
    }

    fn scope(&self) -> Scope {
        Scope::Remote
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn fatal_on_error(&self) -> bool {
        true
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(member) = ctx.member.clone() else {
            return Ok(());
        };
        let user = ctx.resolver.value(&member, "user")?;
        match ctx.run("whoami") {
            Ok(output) => {
                let login = output.trim();
                if !user.is_empty() && login != user {
                    ctx.warning(format!("logged in as '{login}' rather than '{user}'"));
                }
            }
            Err(e) => ctx.error(format!("unable to log in: {e}")),
        }
        Ok(())
    }
}

pub struct TempDirectoryWritableCheck;

impl Check for TempDirectoryWritableCheck {
    fn name(&self) -> &'static str {
        "TempDirectoryWritableCheck"
    }

    fn title(&self) -> &'static str {
        "The temporary directory is writable"
    }

    fn scope(&self) -> Scope {
        Scope::Remote
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(member) = ctx.member.clone() else {
            return Ok(());
        };
        let dir = ctx.resolver.value(&member, "temp_directory")?;
        let command = format!("test -d '{dir}' -a -w '{dir}' && echo writable");
        match ctx.run(&command) {
            Ok(output) if output.trim() == "writable" => {}
            Ok(_) => ctx.error(format!("{dir} is not a writable directory")),
            Err(e) => ctx.error(format!("could not check {dir}: {e}")),
        }
        Ok(())
    }
}

/// Publishes `address:<hostname>` for every configured host as seen from the host under check.
pub struct HostAddressCheck;

impl Check for HostAddressCheck {
    fn name(&self) -> &'static str {
        "HostAddressCheck"
    }

    fn title(&self) -> &'static str {
        "Every configured host resolves"
    }

    fn scope(&self) -> Scope {
        Scope::Remote
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let mut names = Vec::new();
        for host in ctx.resolver.members(Group::Hosts) {
            let name = ctx.resolver.value(&host, "host")?;
            names.push(if name.is_empty() { host.alias } else { name });
        }

        for name in names {
            let output = match ctx.run(&format!("getent hosts {name}")) {
                Ok(output) => output,
                Err(e) => {
                    ctx.error(format!("could not resolve {name}: {e}"));
                    continue;
                }
            };
            match output.split_whitespace().next() {
                Some(address) => {
                    let address = address.to_string();
                    ctx.publish(&format!("address:{name}"), &address);
                }
                None => ctx.error(format!("{name} does not resolve from {}", ctx.host())),
            }
        }
        Ok(())
    }
}

/// Publishes `ping_method:<dataservice>` for every manager on the host under check.
pub struct ManagerPingMethodCheck;

impl Check for ManagerPingMethodCheck {
    fn name(&self) -> &'static str {
        "ManagerPingMethodCheck"
    }

    fn title(&self) -> &'static str {
        "The manager ping method is usable"
    }

    fn scope(&self) -> Scope {
        Scope::Remote
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn enabled(&self, ctx: &CheckContext) -> Result<bool> {
        Ok(!services_on_host(ctx, Group::Managers).is_empty())
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        for manager in services_on_host(ctx, Group::Managers) {
            let method = ctx.resolver.value(&manager, "mgr_ping_method")?;
            let ds = ctx.resolver.dataservice_of(&manager).unwrap_or_default();
            if method == "ping" && ctx.run("command -v ping").is_err() {
                ctx.error(format!("{manager} uses ping but no ping binary was found"));
            }
            ctx.publish(&format!("ping_method:{ds}"), &method);
        }
        Ok(())
    }
}

/// Report every fact under `prefix` on which the publishing hosts disagree.
fn compare_facts(ctx: &mut CheckContext, prefix: &str, what: &str) {
    let mut disagreements = Vec::new();
    for (key, values) in ctx.facts.with_prefix(prefix) {
        let distinct: BTreeSet<&String> = values.values().collect();
        if distinct.len() > 1 {
            let seen: Vec<String> = values.iter().map(|(h, v)| format!("{h}: {v}")).collect();
            disagreements.push(format!(
                "hosts disagree on the {what} of {}: {}",
                &key[prefix.len()..],
                seen.join(", ")
            ));
        }
    }
    for message in disagreements {
        ctx.error(message);
    }
}

pub struct ConsistentAddressesCheck;

impl Check for ConsistentAddressesCheck {
    fn name(&self) -> &'static str {
        "ConsistentAddressesCheck"
    }

    fn title(&self) -> &'static str {
        "All hosts resolve each host to the same address"
    }

    fn scope(&self) -> Scope {
        Scope::Post
    }

    fn target(&self) -> Target {
        Target::Cluster
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        compare_facts(ctx, "address:", "address");
        Ok(())
    }
}

pub struct ConsistentPingMethodCheck;

impl Check for ConsistentPingMethodCheck {
    fn name(&self) -> &'static str {
        "ConsistentPingMethodCheck"
    }

    fn title(&self) -> &'static str {
        "Managers of a dataservice use the same ping method"
    }

    fn scope(&self) -> Scope {
        Scope::Post
    }

    fn target(&self) -> Target {
        Target::Cluster
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        compare_facts(ctx, "ping_method:", "manager ping method");
        Ok(())
    }
}

pub struct ReleaseDirectoryCheck;

impl Check for ReleaseDirectoryCheck {
    fn name(&self) -> &'static str {
        "ReleaseDirectoryCheck"
    }

    fn title(&self) -> &'static str {
        "The release directory can be created"
    }

    fn scope(&self) -> Scope {
        Scope::Commit
    }

    fn target(&self) -> Target {
        Target::Host
    }

    fn enabled(&self, ctx: &CheckContext) -> Result<bool> {
        // Hosts without a service have nothing to install.
        let Some(host) = ctx.member.as_ref() else {
            return Ok(false);
        };
        Ok(Group::SERVICES.iter().any(|g| {
            ctx.resolver
                .members(*g)
                .iter()
                .any(|m| ctx.resolver.host_of(m).as_deref() == Some(to_alias(&host.alias).as_str()))
        }))
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()> {
        let Some(member) = ctx.member.clone() else {
            return Ok(());
        };
        let dir = ctx.resolver.value(&member, "release_directory")?;
        let command = format!("mkdir -p '{dir}' && test -w '{dir}' && echo ok");
        match ctx.run(&command) {
            Ok(output) if output.trim() == "ok" => {}
            Ok(_) => ctx.error(format!("{dir} is not writable")),
            Err(e) => ctx.error(format!("could not create {dir}: {e}")),
        }
        Ok(())
    }
}
