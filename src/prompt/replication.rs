// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    error::Result,
    group::{Group, Member},
    resolve::Resolver,
    topology::Role,
};

use super::{Prompt, PromptRegistry, Validator};

pub const ROLES: &[&str] = &["master", "slave", "relay", "direct"];

pub const DATASOURCE_TYPES: &[&str] = &["mysql", "postgresql", "oracle"];

pub const BACKUP_METHODS: &[&str] = &["none", "mysqldump", "xtrabackup", "pg_dump"];

/// The role the topology assigns to this replication service's host.
fn topology_role(r: &Resolver, m: &Member) -> Result<Option<String>> {
    let (Some(ds), Some(host)) = (r.dataservice_of(m), r.host_of(m)) else {
        return Ok(None);
    };
    Ok(r
        .topology(&ds)
        .get_role(&host)
        .filter(Role::replicates)
        .map(|role| role.to_string()))
}

fn first_master(r: &Resolver, ds: &str) -> Result<String> {
    let masters = r.list_value(&Member::dataservice(ds), "master_host")?;
    Ok(masters.into_iter().next().unwrap_or_default())
}

/// Slaves follow the dataservice master. A relay follows the master of the dataservice it
/// relays from.
fn upstream_master(r: &Resolver, m: &Member) -> Result<Option<String>> {
    let Some(ds) = r.dataservice_of(m) else {
        return Ok(None);
    };
    match r.value(m, "role")?.as_str() {
        "slave" => Ok(Some(first_master(r, &ds)?)),
        "relay" => {
            let source = r.value(&Member::dataservice(&ds), "relay_source")?;
            if source.is_empty() {
                Ok(None)
            } else {
                Ok(Some(first_master(r, &source)?))
            }
        }
        "master" | "direct" => Ok(Some(String::new())),
        _ => Ok(None),
    }
}

fn is_direct(r: &Resolver, m: &Member) -> Result<bool> {
    Ok(r.value(m, "role")? == "direct")
}

fn direct_source(r: &Resolver, m: &Member) -> Result<Option<String>> {
    match r.dataservice_of(m) {
        Some(ds) => {
            let master = first_master(r, &ds)?;
            Ok((!master.is_empty()).then_some(master))
        }
        None => Ok(None),
    }
}

fn default_service_name(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(r.dataservice_of(m))
}

fn default_log_directory(r: &Resolver, m: &Member) -> Result<Option<String>> {
    let Some(host) = r.host_member(m) else {
        return Ok(None);
    };
    Ok(Some(format!("{}/thl", r.value(&host, "home_directory")?)))
}

fn default_datasource_port(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(
        match r.value(m, "datasource_type")?.as_str() {
            "postgresql" => "5432",
            "oracle" => "1521",
            _ => "3306",
        }
        .to_string(),
    ))
}

fn default_relay_logs(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(r
        .dataservice_of(m)
        .map(|ds| r.topology(&ds).disable_relay_logs().to_string()))
}

fn default_backup_method(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(
        match r.value(m, "datasource_type")?.as_str() {
            "mysql" => "mysqldump",
            "postgresql" => "pg_dump",
            _ => "none",
        }
        .to_string(),
    ))
}

pub fn register(registry: &mut PromptRegistry) {
    let g = Group::ReplicationServices;

    registry.register(
        Prompt::new(g, "role", Validator::Choice(ROLES))
            .describe("Replication role of this host")
            .alias("--repl-role")
            .derived(topology_role)
            .required(),
    );
    registry.register(
        Prompt::new(g, "repl_master_host", Validator::Hostname)
            .describe("Host this replicator reads THL from")
            .alias("--master-thl-host")
            .derived(upstream_master),
    );
    registry.register(
        Prompt::new(g, "service_name", Validator::Identifier)
            .describe("Replication service name")
            .alias("--repl-service-name")
            .default_fn(default_service_name),
    );
    registry.register(
        Prompt::new(g, "rmi_port", Validator::Port)
            .describe("Replication RMI listen port")
            .alias("--repl-rmi-port")
            .default_value("10000"),
    );
    registry.register(
        Prompt::new(g, "thl_port", Validator::Port)
            .describe("Port used to serve THL")
            .alias("--repl-thl-port")
            .default_value("2112"),
    );
    registry.register(
        Prompt::new(g, "log_directory", Validator::Path)
            .describe("Directory for THL files")
            .alias("--thl-directory")
            .default_fn(default_log_directory),
    );
    registry.register(
        Prompt::new(g, "datasource_type", Validator::Choice(DATASOURCE_TYPES))
            .describe("Database platform")
            .alias("--repl-datasource-type")
            .default_value("mysql"),
    );
    registry.register(
        Prompt::new(g, "datasource_port", Validator::Port)
            .describe("Database server port")
            .alias("--repl-datasource-port")
            .default_fn(default_datasource_port),
    );
    registry.register(
        Prompt::new(g, "datasource_user", Validator::Text)
            .describe("Database login used by the replicator")
            .alias("--replication-user")
            .required(),
    );
    registry.register(
        Prompt::new(g, "datasource_password", Validator::Text)
            .describe("Database password used by the replicator")
            .alias("--replication-password"),
    );
    registry.register(
        Prompt::new(g, "disable_relay_logs", Validator::Boolean)
            .describe("Read binary logs directly instead of through relay logs")
            .alias("--repl-disable-relay-logs")
            .default_fn(default_relay_logs),
    );
    registry.register(
        Prompt::new(g, "auto_enable", Validator::Boolean)
            .describe("Bring the replicator online at startup")
            .alias("--repl-auto-enable")
            .default_value("true"),
    );
    registry.register(
        Prompt::new(g, "backup_method", Validator::Choice(BACKUP_METHODS))
            .describe("Method used to provision new slaves")
            .alias("--repl-backup-method")
            .default_fn(default_backup_method),
    );
    registry.register(
        Prompt::new(g, "direct_datasource_host", Validator::Hostname)
            .describe("Database host a direct replicator extracts from")
            .alias("--direct-replication-host")
            .enabled_if(is_direct)
            .required_if(is_direct)
            .derived(direct_source),
    );
}
