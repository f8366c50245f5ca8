// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    error::Result,
    group::{Group, Member},
    resolve::Resolver,
    topology::Role,
};

use super::{Prompt, PromptRegistry, Validator};

pub const PING_METHODS: &[&str] = &["ping", "echo"];

pub const POLICIES: &[&str] = &["automatic", "manual", "maintenance"];

/// Managers move the dataservice virtual IP when one is configured.
fn vip_from_dataservice(r: &Resolver, m: &Member) -> Result<Option<String>> {
    match r.dataservice_of(m) {
        Some(ds) => {
            let vip = r.value(&Member::dataservice(ds), "vip_address")?;
            Ok(Some((!vip.is_empty()).to_string()))
        }
        None => Ok(Some("false".to_string())),
    }
}

fn vip_enabled(r: &Resolver, m: &Member) -> Result<bool> {
    r.bool_value(m, "mgr_vip_enabled")
}

fn witness_role(r: &Resolver, m: &Member) -> Result<Option<String>> {
    let (Some(ds), Some(host)) = (r.dataservice_of(m), r.host_of(m)) else {
        return Ok(None);
    };
    let witness = r.topology(&ds).get_role(&host) == Some(Role::Witness);
    Ok(Some(witness.to_string()))
}

pub fn register(registry: &mut PromptRegistry) {
    let g = Group::Managers;

    registry.register(
        Prompt::new(g, "mgr_rmi_port", Validator::Port)
            .describe("Manager RMI listen port")
            .alias("--manager-rmi-port")
            .default_value("9997"),
    );
    registry.register(
        Prompt::new(g, "mgr_listen_port", Validator::Port)
            .describe("Port used for manager group communication")
            .alias("--manager-listen-port")
            .default_value("7800"),
    );
    registry.register(
        Prompt::new(g, "mgr_ping_method", Validator::Choice(PING_METHODS))
            .describe("How managers test reachability of other members")
            .alias("--ping-method")
            .default_value("ping"),
    );
    registry.register(
        Prompt::new(g, "mgr_policy", Validator::Choice(POLICIES))
            .describe("Initial policy mode")
            .alias("--policy-mode")
            .default_value("automatic"),
    );
    registry.register(
        Prompt::new(g, "mgr_vip_enabled", Validator::Boolean)
            .describe("Manage the dataservice virtual IP")
            .alias("--manager-vip-enabled")
            .default_fn(vip_from_dataservice),
    );
    registry.register(
        Prompt::new(g, "mgr_vip_interface", Validator::Text)
            .describe("Network interface the virtual IP is bound to")
            .alias("--vip-interface")
            .enabled_if(vip_enabled)
            .required_if(vip_enabled),
    );
    registry.register(
        Prompt::new(g, "mgr_is_witness", Validator::Boolean)
            .describe("This manager runs on an active witness")
            .derived(witness_role)
            .default_value("false"),
    );
}
