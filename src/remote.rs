// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! remote.rs
//!
//! The seam to the remote command execution collaborator. The engine only ever asks "run this
//! command on that host and give me stdout"; how that happens is up to the executor.

use std::process::Command;

use log::debug;
use thiserror::Error;

pub const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("could not run ssh for {host}: {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' on {host} exited with {status}: {stderr}")]
    Failed {
        host: String,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },
}

impl RemoteError {
    pub fn host(&self) -> &str {
        match self {
            RemoteError::Spawn { host, .. }
            | RemoteError::Failed { host, .. }
            | RemoteError::Unreachable { host, .. } => host,
        }
    }
}

/// Where and as whom a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub user: Option<String>,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>) -> Self {
        Endpoint {
            host: host.into(),
            user: None,
            port: DEFAULT_SSH_PORT,
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        let user = user.into();
        self.user = (!user.is_empty()).then_some(user);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

pub trait RemoteExecutor: Send + Sync {
    /// Run `command` on `endpoint` and return its standard output.
    fn run(&self, endpoint: &Endpoint, command: &str) -> Result<String, RemoteError>;
}

/// Runs commands through the system `ssh` binary.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    pub options: Vec<String>,
}

impl Default for SshExecutor {
    fn default() -> Self {
        SshExecutor {
            options: vec![
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
            ],
        }
    }
}

impl SshExecutor {
    fn args(&self, endpoint: &Endpoint, command: &str) -> Vec<String> {
        let mut args = self.options.clone();
        args.push("-p".to_string());
        args.push(endpoint.port.to_string());
        args.push(endpoint.destination());
        args.push(command.to_string());
        args
    }
}

impl RemoteExecutor for SshExecutor {
    fn run(&self, endpoint: &Endpoint, command: &str) -> Result<String, RemoteError> {
        debug!(
            "Running command on host {} port {}: '{command}'",
            endpoint.destination(),
            endpoint.port
        );
        let output = Command::new("ssh")
            .args(self.args(endpoint, command))
            .output()
            .map_err(|source| RemoteError::Spawn {
                host: endpoint.host.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RemoteError::Failed {
                host: endpoint.host.clone(),
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_arguments_carry_user_and_port() {
        let ssh = SshExecutor::default();
        let args = ssh.args(&Endpoint::new("db1").user("repl").port(2222), "whoami");
        assert_eq!(&args[args.len() - 4..], ["-p", "2222", "repl@db1", "whoami"]);

        let args = ssh.args(&Endpoint::new("db2").user(""), "whoami");
        assert_eq!(&args[args.len() - 4..], ["-p", "22", "db2", "whoami"]);
    }

    #[test]
    fn errors_name_the_host() {
        let e = RemoteError::Unreachable {
            host: "db3".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(e.host(), "db3");
        assert_eq!(e.to_string(), "db3 is unreachable: connection refused");
    }
}
