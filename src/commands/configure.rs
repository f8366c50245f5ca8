// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Args;
use log::info;

use crate::{
    cluster::ConfigureRequest,
    commands::{finish, handled_error, load_cluster, save_cluster, Cli, Handle, HandledResult},
    error::Report,
    fragments,
    settings::parse_settings,
    store::split_list,
};

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// Dataservice to configure, or `defaults`
    target: Option<String>,

    /// Restrict the settings to these hosts
    #[arg(long, value_delimiter = ',')]
    hosts: Vec<String>,

    /// Forget the target's current configuration first
    #[arg(long)]
    reset: bool,

    /// Apply a fragment file before any settings given here
    #[arg(long)]
    ini: Option<String>,

    /// Settings such as `--members=db1,db2`, `--members+=db3` or `--property=key=value`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    settings: Vec<String>,
}

pub fn configure(cli: &Cli, args: &ConfigureArgs) -> HandledResult<()> {
    let mut cluster = load_cluster(cli)?;
    let mut report = Report::new();

    if let Some(ini) = &args.ini {
        let fragments = fragments::load_fragments(std::path::Path::new(ini)).handle_err(|e| {
            eprintln!("Could not read '{ini}': {e}");
        })?;
        fragments::apply_fragments(&mut cluster, &fragments, &mut report).handle_err(|e| {
            eprintln!("Could not apply '{ini}': {e}");
        })?;
    }

    match &args.target {
        Some(target) => {
            let request = ConfigureRequest {
                target: target.clone(),
                hosts: args.hosts.iter().flat_map(|h| split_list(h)).collect(),
                reset: args.reset,
                settings: parse_settings(&args.settings, &mut report),
            };
            cluster.configure(&request, &mut report).handle_err(|e| {
                eprintln!("Could not configure {target}: {e}");
            })?;
        }
        None if args.ini.is_none() => {
            eprintln!("Must name a dataservice, `defaults`, or give --ini.");
            return handled_error();
        }
        None => {}
    }

    if report.has_errors() {
        // Nothing is written when any value was rejected.
        return finish(cli, &report);
    }
    save_cluster(cli, &cluster)?;
    info!("configuration saved to {}", cli.config_path().display());
    finish(cli, &report)
}
