// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

pub mod configure;
pub mod fetch;
pub mod install;
pub mod prune;
pub mod query;
pub mod validate;

use {
    configure::ConfigureArgs,
    fetch::FetchArgs,
    install::InstallArgs,
    prune::DeleteArgs,
    query::QueryArgs,
};

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};

use crate::{
    cluster::Cluster,
    context::Context,
    error::Report,
    remote::SshExecutor,
};

/// A `HandledError` is an error that has already been reported to the user. Callers only pass
/// it on; `main()` turns it into a nonzero exit status.
///
/// Construct one with `handle_err()`, which runs caller-provided reporting code on the original
/// error and then discards it.
#[derive(Debug, PartialEq)]
pub struct HandledError {}

pub type HandledResult<T> = std::result::Result<T, HandledError>;

pub fn handled_error() -> HandledResult<()> {
    HandledResult::Err(HandledError {})
}

pub trait Handle<T, F> {
    fn handle_err(self, handler: F) -> HandledResult<T>;
}

impl<T, E, F: FnOnce(E)> Handle<T, F> for std::result::Result<T, E> {
    /// Run `handler` on the error, then return a `HandledResult` so that callers know it has
    /// been reported.
    fn handle_err(self, handler: F) -> HandledResult<T> {
        self.map_err(|e| {
            handler(e);
            HandledError {}
        })
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path of the persisted configuration
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Report non-fatal validation errors as warnings
    #[arg(long, global = true)]
    pub force: bool,

    #[arg(long, global = true, value_delimiter = ',')]
    pub skip_validation_check: Vec<String>,

    #[arg(long, global = true, value_delimiter = ',')]
    pub enable_validation_check: Vec<String>,

    #[arg(long, global = true, value_delimiter = ',')]
    pub skip_validation_warnings: Vec<String>,

    #[arg(long, global = true, value_delimiter = ',')]
    pub enable_validation_warnings: Vec<String>,

    /// Host whose configuration wins when hosts disagree
    #[arg(long, global = true)]
    pub default_host: Option<String>,

    /// Command that prints a host's configuration; `{home}` is the installation directory
    #[arg(long, global = true)]
    pub query_command: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Change the configuration of a dataservice, or of the defaults
    Configure(ConfigureArgs),
    /// Print the configuration or resolved values
    Query(QueryArgs),
    /// Run the local, remote and post validation checks
    Validate,
    /// Validate, then claim the installation directory
    Install(InstallArgs),
    /// Validate, then refresh an existing installation
    Update(InstallArgs),
    /// Merge the configurations persisted on other hosts into this one
    Fetch(FetchArgs),
    /// Reduce the configuration to its canonical form
    Prune,
    /// Remove a dataservice
    Delete(DeleteArgs),
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        PathBuf::from(
            self.config
                .clone()
                .unwrap_or_else(crate::default_config_path),
        )
    }

    /// The run context described by the global options.
    pub fn context(&self) -> Context {
        let mut context = Context::new(Arc::new(SshExecutor::default()));
        context.force = self.force;
        context.skip_checks = self.skip_validation_check.clone();
        context.enable_checks = self.enable_validation_check.clone();
        context.skip_warnings = self.skip_validation_warnings.clone();
        context.enable_warnings = self.enable_validation_warnings.clone();
        context.default_host = self.default_host.clone();
        if let Some(command) = &self.query_command {
            context.query_command = command.clone();
        }
        context
    }
}

pub(crate) fn load_cluster(cli: &Cli) -> HandledResult<Cluster> {
    let path = cli.config_path();
    Cluster::load(&path, cli.context()).handle_err(|e| {
        eprintln!("Could not load configuration: {e}");
    })
}

pub(crate) fn save_cluster(cli: &Cli, cluster: &Cluster) -> HandledResult<()> {
    cluster.save(&cli.config_path()).handle_err(|e| {
        eprintln!("Could not save configuration: {e}");
    })
}

/// Print collected issues. Any error makes the command fail.
pub(crate) fn finish(cli: &Cli, report: &Report) -> HandledResult<()> {
    if cli.verbose || !report.issues().is_empty() {
        report.print_summary();
    }
    if report.has_errors() {
        return handled_error();
    }
    Ok(())
}

pub fn main(cli: &Cli) -> HandledResult<()> {
    match &cli.command {
        Commands::Configure(args) => configure::configure(cli, args),
        Commands::Query(args) => query::query(cli, args),
        Commands::Validate => validate::validate(cli),
        Commands::Install(args) => install::install(cli, args),
        Commands::Update(args) => install::update(cli, args),
        Commands::Fetch(args) => fetch::fetch(cli, args),
        Commands::Prune => prune::prune(cli),
        Commands::Delete(args) => prune::delete(cli, args),
    }
}
