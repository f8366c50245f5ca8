// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! A prompt is one typed, named configuration item belonging to a group. It is composed of
//! independent capabilities: a validator, a default policy, enabled/required predicates and a
//! command-line binding.

use std::{fmt, net::IpAddr};

use crate::{
    error::{IssueKind, Report, Result},
    group::{Group, Member},
    resolve::Resolver,
};

pub mod connectors;
pub mod dataservices;
pub mod hosts;
pub mod managers;
pub mod registry;
pub mod replication;

pub use registry::PromptRegistry;

/// Computes a default for a member. `Ok(None)` means "no opinion".
pub type DefaultFn = fn(&Resolver, &Member) -> Result<Option<String>>;

pub type Predicate = fn(&Resolver, &Member) -> Result<bool>;

/// The coercion applied to raw values before they are stored or returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validator {
    Text,
    Integer,
    Port,
    Boolean,
    Hostname,
    HostList,
    List,
    /// Absolute filesystem path.
    Path,
    IpAddress,
    /// A dataservice or service name.
    Identifier,
    Choice(&'static [&'static str]),
}

fn valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        && !host.starts_with('-')
        && !host.starts_with('.')
}

impl Validator {
    /// Validate and normalize `raw`, or describe why it was rejected.
    pub fn coerce(&self, raw: &str) -> std::result::Result<String, String> {
        let value = raw.trim();
        match self {
            Validator::Text => Ok(value.to_string()),
            Validator::Integer => value
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| format!("'{value}' is not an integer")),
            Validator::Port => match value.parse::<u16>() {
                Ok(0) | Err(_) => Err(format!("'{value}' is not a valid port number")),
                Ok(port) => Ok(port.to_string()),
            },
            Validator::Boolean => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "on" | "1" => Ok("true".to_string()),
                "false" | "no" | "n" | "off" | "0" | "" => Ok("false".to_string()),
                _ => Err(format!("'{value}' is not a boolean")),
            },
            Validator::Hostname => {
                if valid_hostname(value) {
                    Ok(value.to_string())
                } else {
                    Err(format!("'{value}' is not a valid hostname"))
                }
            }
            Validator::HostList => {
                let hosts = crate::store::split_list(value);
                match hosts.iter().find(|h| !valid_hostname(h)) {
                    Some(bad) => Err(format!("'{bad}' is not a valid hostname")),
                    None => Ok(hosts.join(",")),
                }
            }
            Validator::List => Ok(crate::store::split_list(value).join(",")),
            Validator::Path => {
                if value == "/" || value.is_empty() {
                    Ok(value.to_string())
                } else if value.starts_with('/') {
                    Ok(value.trim_end_matches('/').to_string())
                } else {
                    Err(format!("'{value}' is not an absolute path"))
                }
            }
            Validator::IpAddress => value
                .parse::<IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| format!("'{value}' is not an IP address")),
            Validator::Identifier => {
                if !value.is_empty()
                    && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    Ok(value.to_string())
                } else {
                    Err(format!(
                        "'{value}' may only contain letters, digits and underscores"
                    ))
                }
            }
            Validator::Choice(choices) => {
                if choices.contains(&value) {
                    Ok(value.to_string())
                } else {
                    Err(format!(
                        "'{value}' is not one of: {}",
                        choices.join(", ")
                    ))
                }
            }
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Validator::HostList | Validator::List)
    }
}

/// Where the last layer of a prompt's default comes from.
#[derive(Clone, Copy)]
pub enum Fallback {
    None,
    Constant(&'static str),
    Compute(DefaultFn),
}

#[derive(Clone, Copy)]
pub enum Required {
    Never,
    Always,
    When(Predicate),
}

/// The canonical flag name of a prompt plus any alias flags.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLineBinding {
    pub flag: String,
    pub aliases: Vec<&'static str>,
}

/// Strip leading dashes so `--rmi-port`, `-rmi-port` and `rmi-port` compare equal.
pub fn bare_flag(flag: &str) -> &str {
    flag.trim_start_matches('-')
}

impl CommandLineBinding {
    pub fn for_name(name: &str) -> Self {
        CommandLineBinding {
            flag: format!("--{}", name.replace('_', "-")),
            aliases: Vec::new(),
        }
    }

    pub fn matches(&self, flag: &str) -> bool {
        let flag = bare_flag(flag);
        bare_flag(&self.flag) == flag || self.aliases.iter().any(|a| bare_flag(a) == flag)
    }
}

pub struct Prompt {
    pub name: &'static str,
    pub group: Group,
    pub description: &'static str,
    pub validator: Validator,
    pub binding: CommandLineBinding,
    derived: Option<DefaultFn>,
    fallback: Fallback,
    enabled: Option<Predicate>,
    required: Required,
    disabled_value: &'static str,
    memoize: bool,
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("flag", &self.binding.flag)
            .finish()
    }
}

impl Prompt {
    pub fn new(group: Group, name: &'static str, validator: Validator) -> Self {
        Prompt {
            name,
            group,
            description: "",
            validator,
            binding: CommandLineBinding::for_name(name),
            derived: None,
            fallback: Fallback::None,
            enabled: None,
            required: Required::Never,
            disabled_value: "",
            memoize: false,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn flag(mut self, flag: &'static str) -> Self {
        self.binding.flag = flag.to_string();
        self
    }

    pub fn alias(mut self, flag: &'static str) -> Self {
        self.binding.aliases.push(flag);
        self
    }

    /// A structure-derived default that takes priority over option bags and group defaults.
    pub fn derived(mut self, f: DefaultFn) -> Self {
        self.derived = Some(f);
        self
    }

    pub fn default_value(mut self, value: &'static str) -> Self {
        self.fallback = Fallback::Constant(value);
        self
    }

    pub fn default_fn(mut self, f: DefaultFn) -> Self {
        self.fallback = Fallback::Compute(f);
        self
    }

    pub fn enabled_if(mut self, p: Predicate) -> Self {
        self.enabled = Some(p);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = Required::Always;
        self
    }

    pub fn required_if(mut self, p: Predicate) -> Self {
        self.required = Required::When(p);
        self
    }

    pub fn disabled_value(mut self, value: &'static str) -> Self {
        self.disabled_value = value;
        self
    }

    /// Cache the computed fallback per member. Used for defaults that need a remote call.
    pub fn memoized(mut self) -> Self {
        self.memoize = true;
        self
    }

    pub fn get_derived(&self) -> Option<DefaultFn> {
        self.derived
    }

    pub fn get_fallback(&self) -> Fallback {
        self.fallback
    }

    pub fn get_disabled_value(&self) -> &'static str {
        self.disabled_value
    }

    pub fn is_memoized(&self) -> bool {
        self.memoize
    }

    pub fn is_enabled(&self, resolver: &Resolver, member: &Member) -> Result<bool> {
        match self.enabled {
            Some(p) => p(resolver, member),
            None => Ok(true),
        }
    }

    pub fn is_required(&self, resolver: &Resolver, member: &Member) -> Result<bool> {
        match self.required {
            Required::Never => Ok(false),
            Required::Always => Ok(true),
            Required::When(p) => p(resolver, member),
        }
    }

    /// Run the validator over a raw command-line value. On failure the error is recorded
    /// against this prompt and `None` returned, so remaining flags are still processed.
    pub fn accept(&self, raw: &str, report: &mut Report) -> Option<String> {
        match self.validator.coerce(raw) {
            Ok(value) => Some(value),
            Err(message) => {
                report.error(IssueKind::InvalidValue, self.binding.flag.clone(), message);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validators_normalize() {
        assert_eq!(Validator::Boolean.coerce("Yes").unwrap(), "true");
        assert_eq!(Validator::Port.coerce(" 2112 ").unwrap(), "2112");
        assert!(Validator::Port.coerce("70000").is_err());
        assert_eq!(Validator::HostList.coerce("h1, h2 ,").unwrap(), "h1,h2");
        assert!(Validator::HostList.coerce("h1,bad host").is_err());
        assert_eq!(Validator::Path.coerce("/opt/repl/").unwrap(), "/opt/repl");
        assert_eq!(Validator::Path.coerce("/").unwrap(), "/");
        assert!(Validator::Path.coerce("relative").is_err());
        assert!(Validator::Choice(&["a", "b"]).coerce("c").is_err());
    }

    #[test]
    fn binding_matches_aliases() {
        let prompt = Prompt::new(Group::ReplicationServices, "rmi_port", Validator::Port)
            .alias("--repl-rmi-port");
        assert!(prompt.binding.matches("--rmi-port"));
        assert!(prompt.binding.matches("repl-rmi-port"));
        assert!(!prompt.binding.matches("--thl-port"));
    }

    #[test]
    fn accept_records_invalid_values() {
        let prompt = Prompt::new(Group::ReplicationServices, "rmi_port", Validator::Port);
        let mut report = Report::new();
        assert_eq!(prompt.accept("abc", &mut report), None);
        assert_eq!(prompt.accept("10002", &mut report).as_deref(), Some("10002"));
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues()[0].subject, "--rmi-port");
    }
}
