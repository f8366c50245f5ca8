// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future;
use log::{debug, warn};

use crate::{
    error::{ConfigError, Result},
    remote::{Endpoint, RemoteExecutor},
};

/// Raw fetch outcome per hostname: the command's stdout, or why the host could not answer.
pub type FetchResults = BTreeMap<String, std::result::Result<String, String>>;

async fn fetch_one(
    executor: Arc<dyn RemoteExecutor>,
    endpoint: Endpoint,
    command: String,
    limit: Duration,
    results: Arc<Mutex<FetchResults>>,
) {
    let host = endpoint.host.clone();
    let task = tokio::task::spawn_blocking(move || executor.run(&endpoint, &command));

    let outcome = match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(output))) => Ok(output),
        Ok(Ok(Err(e))) => Err(e.to_string()),
        Ok(Err(e)) => Err(format!("fetch task failed: {e}")),
        Err(_) => Err(format!("no answer within {:?}", limit)),
    };
    match &outcome {
        Ok(output) => debug!("{host} answered with {} bytes", output.len()),
        Err(e) => warn!("could not fetch configuration from {host}: {e}"),
    }

    let mut results = match results.lock() {
        Ok(results) => results,
        Err(poisoned) => poisoned.into_inner(),
    };
    results.insert(host, outcome);
}

/// Run every `(endpoint, command)` request concurrently, each bounded by `limit`. A host that does
/// not answer in time is recorded as failed; its blocking task is left to finish on its own.
pub async fn fetch_configs(
    requests: Vec<(Endpoint, String)>,
    executor: Arc<dyn RemoteExecutor>,
    limit: Duration,
) -> FetchResults {
    let results = Arc::new(Mutex::new(FetchResults::new()));

    let futures = requests.into_iter().map(|(endpoint, command)| {
        fetch_one(
            Arc::clone(&executor),
            endpoint,
            command,
            limit,
            Arc::clone(&results),
        )
    });
    future::join_all(futures).await;

    let results = match results.lock() {
        Ok(results) => results.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    results
}

/// Blocking wrapper around `fetch_configs` for callers outside of a tokio runtime.
pub fn fetch_all(
    requests: Vec<(Endpoint, String)>,
    executor: Arc<dyn RemoteExecutor>,
    limit: Duration,
) -> Result<FetchResults> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ConfigError::io("tokio runtime", e))?;

    let results = rt.block_on(fetch_configs(requests, executor, limit));
    // Hosts that timed out may still hold a blocking thread; do not wait for them.
    rt.shutdown_background();
    Ok(results)
}
