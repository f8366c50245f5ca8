// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use tempfile::TempDir;

use crate::{
    cluster::{Cluster, ConfigureRequest},
    context::Context,
    error::Report,
    remote::{Endpoint, RemoteError, RemoteExecutor},
    store::PropertyStore,
};

struct Rule {
    host: Option<String>,
    prefix: String,
    output: String,
}

/// A scripted `RemoteExecutor`. Commands are answered by the first rule whose host matches (or
/// that applies to every host) and whose prefix starts the command; unmatched commands answer
/// with empty output. Every call is recorded.
#[derive(Default)]
pub struct MockExecutor {
    rules: Mutex<Vec<Rule>>,
    failing: Mutex<BTreeSet<String>>,
    delays: Mutex<BTreeMap<String, Duration>>,
    calls: Mutex<Vec<(Endpoint, String)>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor that passes every remote and commit check.
    pub fn healthy() -> Self {
        let mock = Self::new();
        mock.respond_all("whoami", &crate::default_ssh_user());
        mock.respond_all("echo ${TMPDIR", "/tmp");
        mock.respond_all("test -d", "writable");
        mock.respond_all("getent hosts", "10.0.0.1 host");
        mock.respond_all("command -v ping", "/usr/bin/ping");
        mock.respond_all("mkdir -p", "ok");
        mock
    }

    /// Answer commands starting with `prefix` on `host`. Host rules take priority over
    /// rules for every host.
    pub fn respond(&self, host: &str, prefix: &str, output: &str) {
        self.rules.lock().unwrap().insert(
            0,
            Rule {
                host: Some(host.to_string()),
                prefix: prefix.to_string(),
                output: output.to_string(),
            },
        );
    }

    pub fn respond_all(&self, prefix: &str, output: &str) {
        self.rules.lock().unwrap().push(Rule {
            host: None,
            prefix: prefix.to_string(),
            output: output.to_string(),
        });
    }

    /// Make every command on `host` fail as if it were unreachable.
    pub fn fail_host(&self, host: &str) {
        self.failing.lock().unwrap().insert(host.to_string());
    }

    /// Sleep before answering any command on `host`.
    pub fn delay_host(&self, host: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(host.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(e, c)| (e.host.clone(), c.clone()))
            .collect()
    }

    /// The endpoint of every call made to `host`, in call order.
    pub fn endpoints(&self, host: &str) -> Vec<Endpoint> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e.host == host)
            .map(|(e, _)| e.clone())
            .collect()
    }

    /// Number of calls to `host` (any host when `None`) whose command starts with `prefix`.
    pub fn call_count(&self, host: Option<&str>, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, c)| host.map_or(true, |host| host == e.host) && c.starts_with(prefix))
            .count()
    }
}

impl RemoteExecutor for MockExecutor {
    fn run(&self, endpoint: &Endpoint, command: &str) -> Result<String, RemoteError> {
        let host = endpoint.host.as_str();
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.clone(), command.to_string()));

        let delay = self.delays.lock().unwrap().get(host).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if self.failing.lock().unwrap().contains(host) {
            return Err(RemoteError::Unreachable {
                host: host.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let rules = self.rules.lock().unwrap();
        let output = rules
            .iter()
            .find(|r| r.host.as_deref().map_or(true, |h| h == host) && command.starts_with(&r.prefix))
            .map(|r| r.output.clone())
            .unwrap_or_default();
        Ok(output)
    }
}

/// A context that talks to `executor` instead of real hosts.
pub fn mock_context(executor: Arc<MockExecutor>) -> Context {
    let mut context = Context::new(executor);
    context.fetch_timeout = Duration::from_secs(2);
    context
}

pub fn cluster_from_json(json: serde_json::Value, executor: Arc<MockExecutor>) -> Cluster {
    Cluster::new(
        PropertyStore::from_value(json).unwrap(),
        mock_context(executor),
    )
}

/// Apply `request` to `cluster`, asserting that it produced no errors.
pub fn configure_ok(cluster: &mut Cluster, request: ConfigureRequest) {
    let mut report = Report::new();
    cluster.configure(&request, &mut report).unwrap();
    assert!(
        !report.has_errors(),
        "configure reported errors: {:?}",
        report.issues()
    );
}

/// A clustered dataservice `alpha` on db1, db2 and db3 with db1 as master.
pub fn three_node_cluster(executor: Arc<MockExecutor>) -> Cluster {
    let mut cluster = Cluster::new(PropertyStore::new(), mock_context(executor));
    configure_ok(
        &mut cluster,
        ConfigureRequest::new("defaults").set("datasource-user", "tungsten"),
    );
    configure_ok(
        &mut cluster,
        ConfigureRequest::new("alpha")
            .set("members", "db1,db2,db3")
            .set("master", "db1"),
    );
    cluster
}

/// A private scratch directory for one test, removed when the environment is dropped.
pub struct TestEnvironment {
    dir: TempDir,
}

impl TestEnvironment {
    pub fn new(test_id: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("replcfg-{test_id}-"))
            .tempdir()?;
        Ok(TestEnvironment { dir })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir().join("deploy.json")
    }

    pub fn write(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.dir().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
