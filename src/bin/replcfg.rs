// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Parser;

use replcfg_lib::{
    self,
    commands::{self, Cli},
};

/// The replcfg binary configures, validates and reconciles a replication cluster.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("REPLCFG_LOG", "warn"))
        .init();

    let args = Cli::parse();

    if commands::main(&args).is_err() {
        std::process::exit(1);
    }
}
