// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Turning raw `--flag=value` arguments into settings. Which prompt a flag belongs to is
//! decided later, against the prompt registry.

use crate::error::{IssueKind, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingOp {
    Set,
    /// `--flag+=a,b`: union into the list.
    Append,
    /// `--flag-=a`: remove from the list.
    Subtract,
    /// `--remove-property=key`
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    /// Flag (without leading dashes) or prompt name.
    pub key: String,
    pub op: SettingOp,
    pub value: String,
}

impl Setting {
    pub fn new(key: impl Into<String>, op: SettingOp, value: impl Into<String>) -> Self {
        Setting {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, SettingOp::Set, value)
    }

    /// A setting from a `key = value` pair, where `key+` and `key-` ask for a list operation.
    pub fn from_pair(key: &str, value: impl Into<String>) -> Self {
        let (key, op) = key_op(key.trim());
        Self::new(key, op, value)
    }
}

/// Split a `key`, `key+` or `key-` into the key and the list operation it asks for.
fn key_op(key: &str) -> (&str, SettingOp) {
    if let Some(k) = key.strip_suffix('+') {
        (k, SettingOp::Append)
    } else if let Some(k) = key.strip_suffix('-') {
        (k, SettingOp::Subtract)
    } else {
        (key, SettingOp::Set)
    }
}

/// Parse a `key=value` pair as given to `--property`.
fn parse_property(pair: &str, report: &mut Report) -> Option<Setting> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => {
            let (key, op) = key_op(key.trim());
            Some(Setting::new(key, op, value.trim()))
        }
        _ => {
            report.error(
                IssueKind::InvalidValue,
                "--property",
                format!("'{pair}' is not of the form key=value"),
            );
            None
        }
    }
}

/// Parse command-line arguments of the forms `--flag=value`, `--flag value`, `--flag`
/// (boolean true), `--flag+=list`, `--flag-=list`, `--property=key=value` and
/// `--remove-property=key`. Malformed arguments are recorded and skipped.
pub fn parse_settings(args: &[String], report: &mut Report) -> Vec<Setting> {
    let mut settings = Vec::new();
    let mut args = args.iter().peekable();

    while let Some(arg) = args.next() {
        let Some(body) = arg.strip_prefix("--") else {
            report.error(
                IssueKind::InvalidValue,
                arg.clone(),
                "unexpected argument; options must start with '--'",
            );
            continue;
        };

        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        let value = match inline {
            Some(value) => value,
            None => match args.peek() {
                Some(next) if !next.starts_with("--") => args.next().cloned().unwrap_or_default(),
                _ => "true".to_string(),
            },
        };

        match name {
            "property" => settings.extend(parse_property(&value, report)),
            "remove-property" => settings.push(Setting::new(value, SettingOp::Remove, "")),
            _ => {
                let (key, op) = key_op(name);
                settings.push(Setting::new(key, op, value));
            }
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_every_form() {
        let mut report = Report::new();
        let settings = parse_settings(
            &args(&[
                "--members=h1,h2",
                "--master",
                "h1",
                "--members+=h4",
                "--connectors-=h2",
                "--enable-active-witnesses",
                "--property=rmi_port=10002",
                "--remove-property=thl-port",
            ]),
            &mut report,
        );
        assert!(!report.has_errors());
        assert_eq!(
            settings,
            vec![
                Setting::set("members", "h1,h2"),
                Setting::set("master", "h1"),
                Setting::new("members", SettingOp::Append, "h4"),
                Setting::new("connectors", SettingOp::Subtract, "h2"),
                Setting::set("enable-active-witnesses", "true"),
                Setting::set("rmi_port", "10002"),
                Setting::new("thl-port", SettingOp::Remove, ""),
            ]
        );
    }

    #[test]
    fn bad_arguments_do_not_stop_parsing() {
        let mut report = Report::new();
        let settings = parse_settings(
            &args(&["stray", "--property=novalue", "--thl-port=2113"]),
            &mut report,
        );
        assert_eq!(report.error_count(), 2);
        assert_eq!(settings, vec![Setting::set("thl-port", "2113")]);
    }
}
