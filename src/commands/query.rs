// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::{Args, ValueEnum};

use crate::{
    commands::{handled_error, load_cluster, Cli, Handle, HandledResult},
    group::{to_alias, Group, Member},
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum QueryKind {
    /// The persisted configuration as JSON
    Config,
    /// Dataservice names
    Dataservices,
    /// Every host's role in each dataservice
    Roles,
    /// Resolved values of one member, e.g. `repl_services.alpha_db1`
    Values,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(value_enum)]
    kind: QueryKind,

    /// `group.alias` member for `values`
    member: Option<String>,
}

pub fn query(cli: &Cli, args: &QueryArgs) -> HandledResult<()> {
    let cluster = load_cluster(cli)?;

    match args.kind {
        QueryKind::Config => println!("{}", cluster.store().to_json()),
        QueryKind::Dataservices => {
            for ds in cluster.dataservices() {
                println!("{ds}");
            }
        }
        QueryKind::Roles => {
            for ds in cluster.dataservices() {
                let topology = cluster.topology(&ds);
                println!("{ds} ({})", topology.kind);
                for host in &topology.members {
                    match topology.get_role(&to_alias(host)) {
                        Some(role) => println!("  {host}: {role}"),
                        None => println!("  {host}: -"),
                    }
                }
            }
        }
        QueryKind::Values => {
            let Some((group, alias)) = args.member.as_deref().and_then(|m| m.split_once('.')) else {
                eprintln!("`values` needs a member such as repl_services.alpha_db1");
                return handled_error();
            };
            let Some(group) = Group::from_key(group) else {
                eprintln!("unknown group '{group}'");
                return handled_error();
            };
            let member = Member::new(group, alias);
            let values = cluster.resolver().resolve_all(&member).handle_err(|e| {
                eprintln!("Could not resolve {member}: {e}");
            })?;
            for (name, value) in values {
                println!("{name}\t{value}");
            }
        }
    }
    Ok(())
}
