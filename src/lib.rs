// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::time::Duration;

pub mod cluster;
pub mod commands;
pub mod context;
pub mod error;
pub mod fragments;
pub mod group;
pub mod lock;
pub mod prompt;
pub mod reconcile;
pub mod remote;
pub mod resolve;
pub mod settings;
pub mod store;
pub mod test_env;
pub mod topology;
pub mod validation;

pub fn default_config_path() -> String {
    match std::env::var("REPLCFG_CONFIG") {
        Ok(conf) => conf,
        Err(_) => "/etc/replcfg/deploy.json".to_string(),
    }
}

/// Per-host bound on a configuration fetch, in seconds.
pub fn default_fetch_timeout() -> Duration {
    let secs = match std::env::var("REPLCFG_FETCH_TIMEOUT") {
        Ok(secs) => secs.parse::<u64>().unwrap_or_else(|_| {
            log::warn!("REPLCFG_FETCH_TIMEOUT must be a number of seconds; using 10");
            10
        }),
        Err(_) => 10,
    };
    Duration::from_secs(secs)
}

/// The command that prints a host's persisted configuration. `{home}` is replaced by the
/// host's installation directory.
pub fn default_query_command() -> String {
    match std::env::var("REPLCFG_QUERY_COMMAND") {
        Ok(command) => command,
        Err(_) => "{home}/replcfg query config".to_string(),
    }
}

pub fn default_ssh_user() -> String {
    match std::env::var("USER") {
        Ok(user) if !user.is_empty() => user,
        _ => "tungsten".to_string(),
    }
}
