// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{sync::Arc, time::Duration};

use crate::remote::{RemoteExecutor, SshExecutor};

/// State shared by every stage of one invocation: operator overrides and the remote executor.
/// It is passed explicitly to the resolver, the validation pipeline and reconciliation.
#[derive(Clone)]
pub struct Context {
    /// Demote non-fatal validation errors to warnings.
    pub force: bool,
    pub skip_checks: Vec<String>,
    pub enable_checks: Vec<String>,
    pub skip_warnings: Vec<String>,
    pub enable_warnings: Vec<String>,
    /// Explicit reconciliation anchor. When set, conflicting host values resolve silently to
    /// this host's value.
    pub default_host: Option<String>,
    /// Per-host bound on a configuration fetch.
    pub fetch_timeout: Duration,
    /// Command used to ask a host for its persisted configuration.
    pub query_command: String,
    pub executor: Arc<dyn RemoteExecutor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("force", &self.force)
            .field("skip_checks", &self.skip_checks)
            .field("enable_checks", &self.enable_checks)
            .field("skip_warnings", &self.skip_warnings)
            .field("enable_warnings", &self.enable_warnings)
            .field("default_host", &self.default_host)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("query_command", &self.query_command)
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Arc::new(SshExecutor::default()))
    }
}

impl Context {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Context {
            force: false,
            skip_checks: Vec::new(),
            enable_checks: Vec::new(),
            skip_warnings: Vec::new(),
            enable_warnings: Vec::new(),
            default_host: None,
            fetch_timeout: crate::default_fetch_timeout(),
            query_command: crate::default_query_command(),
            executor,
        }
    }
}
