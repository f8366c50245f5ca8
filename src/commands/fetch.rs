// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Args;
use log::info;

use crate::{
    commands::{finish, load_cluster, save_cluster, Cli, Handle, HandledResult},
    error::Report,
    reconcile,
    store::split_list,
};

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Hosts to fetch from; defaults to every configured host
    #[arg(value_delimiter = ',')]
    hosts: Vec<String>,
}

pub fn fetch(cli: &Cli, args: &FetchArgs) -> HandledResult<()> {
    let mut cluster = load_cluster(cli)?;
    let hosts: Vec<String> = if args.hosts.is_empty() {
        cluster.hostnames()
    } else {
        args.hosts.iter().flat_map(|h| split_list(h)).collect()
    };

    let mut report = Report::new();
    let outcome = reconcile::reconcile(&cluster, &hosts, &mut report).handle_err(|e| {
        eprintln!("Could not fetch configurations: {e}");
    })?;

    if report.has_errors() {
        eprintln!(
            "{} conflicting value(s); nothing was written",
            outcome.conflicts.len()
        );
        return finish(cli, &report);
    }

    if let Some(anchor) = &outcome.anchor {
        info!("merged configurations anchored on {anchor}");
    }
    cluster.replace_store(outcome.store);
    save_cluster(cli, &cluster)?;
    finish(cli, &report)
}
