// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{collections::BTreeMap, fmt};

use thiserror::Error;

/// Conditions that terminate a run immediately. Everything else (bad flag values, missing
/// required values, failed checks, reconciliation conflicts) is collected into a `Report`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("circular default dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("unknown configuration item '{0}'")]
    UnknownPrompt(String),

    #[error("corrupt configuration at '{path}': {reason}")]
    Corrupt { path: String, reason: String },

    #[error("no host could be reached: {}", .0.join(", "))]
    AllHostsUnreachable(Vec<String>),

    #[error("directory '{0}' is already configured; use 'update' to modify it")]
    Locked(String),

    #[error("directory '{0}' has not been configured; use 'install' first")]
    NotLocked(String),

    #[error("fatal check '{check}' failed: {message}")]
    FatalCheck { check: String, message: String },

    #[error("i/o error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid fragment file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: &[&str], reason: impl Into<String>) -> Self {
        ConfigError::Corrupt {
            path: path.join("."),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Severity::Warning => "WARN",
                Severity::Error => "ERROR",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// A validator rejected a raw value.
    InvalidValue,
    /// A required prompt resolved empty.
    Resolution,
    /// A validation check failed.
    Validation,
    /// Two hosts disagree on a shared section value.
    Conflict,
    /// Informational.
    Notice,
}

/// A single collected problem, attributed to the host/alias/subject it concerns so that
/// multi-host runs can present a per-host summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub host: Option<String>,
    pub alias: Option<String>,
    /// Prompt name, flag or check name.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.severity)?;
        match (&self.host, &self.alias) {
            (Some(host), Some(alias)) => write!(f, "[{host}/{alias}] ")?,
            (Some(host), None) => write!(f, "[{host}] ")?,
            (None, Some(alias)) => write!(f, "[{alias}] ")?,
            (None, None) => {}
        }
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// The shared error/warning counter that resolution, validation and reconciliation all
/// record into.
#[derive(Debug, Default, Clone)]
pub struct Report {
    issues: Vec<Issue>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: Issue) {
        log::debug!("{issue}");
        self.issues.push(issue);
    }

    pub fn error(&mut self, kind: IssueKind, subject: impl Into<String>, message: impl Into<String>) {
        self.record(Issue {
            severity: Severity::Error,
            kind,
            host: None,
            alias: None,
            subject: subject.into(),
            message: message.into(),
        });
    }

    pub fn warning(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.record(Issue {
            severity: Severity::Warning,
            kind: IssueKind::Notice,
            host: None,
            alias: None,
            subject: subject.into(),
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn extend(&mut self, other: Report) {
        self.issues.extend(other.issues);
    }

    /// Group issues by the host they were attributed to. Issues without a host are listed
    /// under the empty string.
    pub fn by_host(&self) -> BTreeMap<String, Vec<&Issue>> {
        let mut hosts: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            hosts
                .entry(issue.host.clone().unwrap_or_default())
                .or_default()
                .push(issue);
        }
        hosts
    }

    /// Print every issue to stderr, grouped per host.
    pub fn print_summary(&self) {
        for (host, issues) in self.by_host() {
            if !host.is_empty() {
                eprintln!("{host}:");
            }
            for issue in issues {
                eprintln!("  {issue}");
            }
        }
        eprintln!(
            "{} error(s), {} warning(s)",
            self.error_count(),
            self.warning_count()
        );
    }
}
