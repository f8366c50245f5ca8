// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use log::debug;

use crate::{
    error::Result,
    group::{Group, Member},
    resolve::Resolver,
};

use super::{Prompt, PromptRegistry, Validator};

/// Fallback when the host cannot be asked for its temporary directory.
const DEFAULT_TEMP_DIRECTORY: &str = "/tmp";

fn default_user(_r: &Resolver, _m: &Member) -> Result<Option<String>> {
    Ok(Some(crate::default_ssh_user()))
}

fn default_release_directory(r: &Resolver, m: &Member) -> Result<Option<String>> {
    Ok(Some(format!("{}/releases", r.value(m, "home_directory")?)))
}

/// Ask the host itself where temporary files belong. This is a remote call, so the prompt is
/// memoized.
fn detect_temp_directory(r: &Resolver, m: &Member) -> Result<Option<String>> {
    if r.value(m, "host")?.is_empty() {
        return Ok(Some(DEFAULT_TEMP_DIRECTORY.to_string()));
    }
    let endpoint = r.endpoint(m)?;
    let host = &endpoint.host;
    match r.context().executor.run(&endpoint, "echo ${TMPDIR:-/tmp}") {
        Ok(output) if output.trim().starts_with('/') => Ok(Some(output.trim().to_string())),
        Ok(output) => {
            debug!("Unexpected temp directory '{}' reported by {host}", output.trim());
            Ok(Some(DEFAULT_TEMP_DIRECTORY.to_string()))
        }
        Err(e) => {
            debug!("Could not detect temp directory: {e}");
            Ok(Some(DEFAULT_TEMP_DIRECTORY.to_string()))
        }
    }
}

pub fn register(registry: &mut PromptRegistry) {
    let g = Group::Hosts;

    registry.register(
        Prompt::new(g, "host", Validator::Hostname)
            .describe("DNS hostname")
            .alias("--hostname")
            .required(),
    );
    registry.register(
        Prompt::new(g, "user", Validator::Text)
            .describe("System user that owns the installation")
            .alias("--install-user")
            .default_fn(default_user),
    );
    registry.register(
        Prompt::new(g, "ssh_port", Validator::Port)
            .describe("Port used for SSH connections")
            .default_value("22"),
    );
    registry.register(
        Prompt::new(g, "home_directory", Validator::Path)
            .describe("Installation directory")
            .alias("--install-directory")
            .default_value("/opt/replicator"),
    );
    registry.register(
        Prompt::new(g, "release_directory", Validator::Path)
            .describe("Directory holding materialized releases")
            .default_fn(default_release_directory),
    );
    registry.register(
        Prompt::new(g, "temp_directory", Validator::Path)
            .describe("Temporary directory on the host")
            .alias("--tmp-directory")
            .default_fn(detect_temp_directory)
            .memoized(),
    );
    registry.register(
        Prompt::new(g, "root_command_prefix", Validator::Boolean)
            .describe("Prefix privileged commands with sudo")
            .alias("--enable-sudo-access")
            .default_value("false"),
    );
    registry.register(
        Prompt::new(g, "skip_validation_check", Validator::List)
            .describe("Validation checks to skip on this host"),
    );
    registry.register(
        Prompt::new(g, "enable_validation_check", Validator::List)
            .describe("Validation checks to run on this host even if skipped"),
    );
    registry.register(
        Prompt::new(g, "skip_validation_warnings", Validator::List)
            .describe("Validation checks whose warnings are suppressed on this host"),
    );
    registry.register(
        Prompt::new(g, "enable_validation_warnings", Validator::List)
            .describe("Validation checks whose warnings are shown even if suppressed"),
    );
}
