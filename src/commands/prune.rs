// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Args;

use crate::{
    commands::{handled_error, load_cluster, save_cluster, Cli, HandledResult},
    reconcile::prune::PruneSummary,
};

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    dataservice: String,
}

fn print_summary(summary: &PruneSummary) {
    if summary.is_empty() {
        println!("Nothing to remove");
        return;
    }
    println!("Removed {} value(s) equal to their defaults", summary.default_values);
    println!("Removed {} option bag(s)", summary.option_bags);
    for service in &summary.services {
        println!("Removed {service}");
    }
    for host in &summary.hosts {
        println!("Removed hosts.{host}");
    }
}

pub fn prune(cli: &Cli) -> HandledResult<()> {
    let mut cluster = load_cluster(cli)?;
    let summary = cluster.prune();
    print_summary(&summary);
    save_cluster(cli, &cluster)
}

pub fn delete(cli: &Cli, args: &DeleteArgs) -> HandledResult<()> {
    let mut cluster = load_cluster(cli)?;
    if !cluster.dataservices().contains(&args.dataservice) {
        eprintln!("No dataservice named '{}'", args.dataservice);
        return handled_error();
    }
    let summary = cluster.delete_dataservice(&args.dataservice);
    print_summary(&summary);
    save_cluster(cli, &cluster)
}
