// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::path::PathBuf;

use clap::Args;

use crate::{
    cluster::Cluster,
    commands::{finish, load_cluster, save_cluster, validate::run_checks, Cli, Handle, HandledResult},
    error::Report,
    group::{Group, Member},
    lock::{self, Action},
    validation::Scope,
};

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Installation directory to lock; defaults to the configured home directory
    #[arg(long)]
    directory: Option<String>,
}

fn directory(cluster: &Cluster, args: &InstallArgs) -> HandledResult<PathBuf> {
    if let Some(dir) = &args.directory {
        return Ok(PathBuf::from(dir));
    }
    cluster
        .resolver()
        .value(&Member::defaults(Group::Hosts), "home_directory")
        .map(PathBuf::from)
        .handle_err(|e| eprintln!("Could not determine the installation directory: {e}"))
}

fn deploy(cli: &Cli, args: &InstallArgs, action: Action) -> HandledResult<()> {
    let cluster = load_cluster(cli)?;
    let dir = directory(&cluster, args)?;

    // Refuse early, before any host is contacted.
    match action {
        Action::Install if lock::is_locked(&dir) => {
            eprintln!("{}", crate::error::ConfigError::Locked(dir.display().to_string()));
            return crate::commands::handled_error();
        }
        Action::Update if !lock::is_locked(&dir) => {
            eprintln!("{}", crate::error::ConfigError::NotLocked(dir.display().to_string()));
            return crate::commands::handled_error();
        }
        _ => {}
    }

    let mut report = Report::new();
    run_checks(&cluster, &Scope::ORDER, &mut report)?;
    if report.has_errors() {
        return finish(cli, &report);
    }

    let dataservices = cluster.dataservices();
    let record = match action {
        Action::Install => lock::acquire(&dir, &dataservices),
        Action::Update => lock::refresh(&dir, &dataservices),
    }
    .handle_err(|e| eprintln!("{e}"))?;

    save_cluster(cli, &cluster)?;
    println!(
        "{} of {} recorded in {}",
        record.action,
        dataservices.join(", "),
        lock::lock_path(&dir).display()
    );
    finish(cli, &report)
}

pub fn install(cli: &Cli, args: &InstallArgs) -> HandledResult<()> {
    deploy(cli, args, Action::Install)
}

pub fn update(cli: &Cli, args: &InstallArgs) -> HandledResult<()> {
    deploy(cli, args, Action::Update)
}
