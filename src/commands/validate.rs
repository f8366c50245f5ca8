// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    cluster::Cluster,
    commands::{finish, load_cluster, Cli, Handle, HandledResult},
    error::Report,
    validation::{CheckRegistry, Pipeline, Scope},
};

/// Run `scopes` of the standard checks over `cluster`, collecting issues into `report`.
pub(crate) fn run_checks(
    cluster: &Cluster,
    scopes: &[Scope],
    report: &mut Report,
) -> HandledResult<()> {
    let registry = CheckRegistry::standard();
    let resolver = cluster.resolver();
    Pipeline::new(&registry)
        .run(&resolver, scopes, report)
        .handle_err(|e| {
            report.print_summary();
            eprintln!("Validation stopped: {e}");
        })?;
    Ok(())
}

pub fn validate(cli: &Cli) -> HandledResult<()> {
    let cluster = load_cluster(cli)?;
    let mut report = Report::new();

    run_checks(
        &cluster,
        &[Scope::Local, Scope::Remote, Scope::Post],
        &mut report,
    )?;

    if !report.has_errors() {
        println!("Validation passed with {} warning(s)", report.warning_count());
    }
    finish(cli, &report)
}
