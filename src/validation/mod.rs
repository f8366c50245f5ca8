// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! The validation pipeline. Checks are grouped into scopes that run in a fixed order; within
//! a scope every check runs against each of its targets before the next check starts.

pub mod checks;

use std::{collections::BTreeMap, fmt};

use log::{debug, info};

use crate::{
    error::{ConfigError, Issue, IssueKind, Report, Result, Severity},
    group::{Group, Member},
    remote::Endpoint,
    resolve::Resolver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    /// Consistency of the configuration itself; no host is contacted.
    Local,
    /// Per-host checks that run commands on the host.
    Remote,
    /// Cross-host comparison of facts published by remote checks.
    Post,
    /// Final checks before anything is written to the hosts.
    Commit,
}

impl Scope {
    pub const ORDER: [Scope; 4] = [Scope::Local, Scope::Remote, Scope::Post, Scope::Commit];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Scope::Local => "local",
                Scope::Remote => "remote",
                Scope::Post => "post",
                Scope::Commit => "commit",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Host,
    Dataservice,
    Cluster,
}

/// Values remote checks learn about hosts, keyed by fact name and then by the publishing host.
#[derive(Debug, Default, Clone)]
pub struct Facts {
    values: BTreeMap<String, BTreeMap<String, String>>,
}

impl Facts {
    pub fn publish(&mut self, host: &str, key: &str, value: &str) {
        self.values
            .entry(key.to_string())
            .or_default()
            .insert(host.to_string(), value.to_string());
    }

    pub fn get(&self, host: &str, key: &str) -> Option<&str> {
        self.values.get(key)?.get(host).map(String::as_str)
    }

    /// Every published `(key, host -> value)` whose key starts with `prefix`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a BTreeMap<String, String>)> + 'a {
        self.values
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What a check sees while it runs against one target.
pub struct CheckContext<'c, 'r> {
    pub resolver: &'c Resolver<'r>,
    /// The host or dataservice under check; `None` for cluster-wide checks.
    pub member: Option<Member>,
    /// Hostname of the host under check.
    pub hostname: Option<String>,
    pub facts: &'c mut Facts,
    issues: Vec<Issue>,
}

impl<'c, 'r> CheckContext<'c, 'r> {
    fn new(
        resolver: &'c Resolver<'r>,
        member: Option<Member>,
        hostname: Option<String>,
        facts: &'c mut Facts,
    ) -> Self {
        CheckContext {
            resolver,
            member,
            hostname,
            facts,
            issues: Vec::new(),
        }
    }

    pub fn host(&self) -> &str {
        self.hostname.as_deref().unwrap_or_default()
    }

    fn issue(&mut self, severity: Severity, message: String) {
        self.issues.push(Issue {
            severity,
            kind: IssueKind::Validation,
            host: self.hostname.clone(),
            alias: self.member.as_ref().map(|m| m.alias.clone()),
            subject: String::new(),
            message,
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.issue(Severity::Error, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.issue(Severity::Warning, message.into());
    }

    /// Record a fully formed issue, e.g. one produced by the resolver.
    pub fn record(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn publish(&mut self, key: &str, value: &str) {
        let host = self.host().to_string();
        self.facts.publish(&host, key, value);
    }

    /// Run `command` on the host under check, as its configured user and SSH port.
    pub fn run(&self, command: &str) -> std::result::Result<String, String> {
        let endpoint = match self.member.as_ref().filter(|m| m.group == Group::Hosts) {
            Some(host) => self
                .resolver
                .endpoint_for(host, self.host())
                .map_err(|e| e.to_string())?,
            None => Endpoint::new(self.host()),
        };
        self.resolver
            .context()
            .executor
            .run(&endpoint, command)
            .map_err(|e| e.to_string())
    }
}

pub trait Check {
    /// Name used by the skip and enable lists.
    fn name(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn scope(&self) -> Scope;

    fn target(&self) -> Target;

    /// A failing fatal check stops the pipeline, even under `--force`.
    fn fatal_on_error(&self) -> bool {
        false
    }

    fn enabled(&self, _ctx: &CheckContext) -> Result<bool> {
        Ok(true)
    }

    fn run(&self, ctx: &mut CheckContext) -> Result<()>;
}

#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut registry = Self::new();
        checks::register(&mut registry);
        registry
    }

    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(|c| c.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Check> {
        self.iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn scope(&self, scope: Scope) -> impl Iterator<Item = &dyn Check> {
        self.iter().filter(move |c| c.scope() == scope)
    }
}

/// The skip and enable lists in effect for one target.
#[derive(Debug, Default)]
struct Policy {
    skip_checks: Vec<String>,
    enable_checks: Vec<String>,
    skip_warnings: Vec<String>,
    enable_warnings: Vec<String>,
}

fn listed(list: &[String], name: &str) -> bool {
    list.iter().any(|n| n.eq_ignore_ascii_case(name))
}

impl Policy {
    /// The command-line lists plus the lists configured for the target: a host's own lists, a
    /// dataservice's lists on top of the hosts defaults, or the hosts defaults alone for
    /// cluster-wide checks.
    fn for_target(resolver: &Resolver, member: Option<&Member>) -> Result<Self> {
        let context = resolver.context();
        let mut policy = Policy {
            skip_checks: context.skip_checks.clone(),
            enable_checks: context.enable_checks.clone(),
            skip_warnings: context.skip_warnings.clone(),
            enable_warnings: context.enable_warnings.clone(),
        };
        let host_defaults = Member::defaults(Group::Hosts);
        match member {
            Some(host) if host.group == Group::Hosts => policy.extend(resolver, host, "")?,
            Some(ds) if ds.group == Group::Dataservices => {
                policy.extend(resolver, &host_defaults, "")?;
                policy.extend(resolver, ds, "dataservice_")?;
            }
            _ => policy.extend(resolver, &host_defaults, "")?,
        }
        Ok(policy)
    }

    fn extend(&mut self, resolver: &Resolver, source: &Member, prefix: &str) -> Result<()> {
        let configured = |name: &str| resolver.list_value(source, &format!("{prefix}{name}"));
        self.skip_checks.extend(configured("skip_validation_check")?);
        self.enable_checks.extend(configured("enable_validation_check")?);
        self.skip_warnings.extend(configured("skip_validation_warnings")?);
        self.enable_warnings.extend(configured("enable_validation_warnings")?);
        Ok(())
    }

    fn skips(&self, check: &str) -> bool {
        listed(&self.skip_checks, check) && !listed(&self.enable_checks, check)
    }

    fn hides_warnings(&self, check: &str) -> bool {
        listed(&self.skip_warnings, check) && !listed(&self.enable_warnings, check)
    }
}

/// What ran, for reporting and tests.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// `check@target` for every check run.
    pub ran: Vec<String>,
    pub skipped: Vec<String>,
    pub commit_ran: bool,
    pub facts: Facts,
}

pub struct Pipeline<'a> {
    registry: &'a CheckRegistry,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a CheckRegistry) -> Self {
        Pipeline { registry }
    }

    fn targets(resolver: &Resolver, target: Target) -> Result<Vec<(Option<Member>, Option<String>)>> {
        Ok(match target {
            Target::Cluster => vec![(None, None)],
            Target::Dataservice => resolver
                .members(Group::Dataservices)
                .into_iter()
                .map(|m| (Some(m), None))
                .collect(),
            Target::Host => {
                let mut hosts = Vec::new();
                for member in resolver.members(Group::Hosts) {
                    let name = resolver.value(&member, "host")?;
                    let name = if name.is_empty() { member.alias.clone() } else { name };
                    hosts.push((Some(member), Some(name)));
                }
                hosts
            }
        })
    }

    /// Run the given scopes in pipeline order. Issues go to `report`. A failing fatal check
    /// returns `ConfigError::FatalCheck` right away; the commit scope is skipped when the
    /// report holds any error by the time it would start.
    pub fn run(
        &self,
        resolver: &Resolver,
        scopes: &[Scope],
        report: &mut Report,
    ) -> Result<ValidationOutcome> {
        let mut outcome = ValidationOutcome::default();
        let force = resolver.context().force;

        for scope in Scope::ORDER.into_iter().filter(|s| scopes.contains(s)) {
            if scope == Scope::Commit && report.has_errors() {
                info!(
                    "skipping commit checks: {} error(s) found",
                    report.error_count()
                );
                break;
            }
            debug!("running {scope} checks");

            for check in self.registry.scope(scope) {
                for (member, hostname) in Self::targets(resolver, check.target())? {
                    let policy = Policy::for_target(resolver, member.as_ref())?;
                    let label = match &member {
                        Some(m) => format!("{}@{}", check.name(), m.alias),
                        None => check.name().to_string(),
                    };

                    let mut ctx = CheckContext::new(resolver, member, hostname, &mut outcome.facts);
                    if policy.skips(check.name()) || !check.enabled(&ctx)? {
                        outcome.skipped.push(label);
                        continue;
                    }
                    check.run(&mut ctx)?;
                    let issues = std::mem::take(&mut ctx.issues);
                    outcome.ran.push(label);

                    for mut issue in issues {
                        if issue.subject.is_empty() {
                            issue.subject = check.name().to_string();
                        }
                        if issue.severity == Severity::Error {
                            if check.fatal_on_error() {
                                let message = issue.message.clone();
                                report.record(issue);
                                return Err(ConfigError::FatalCheck {
                                    check: check.name().to_string(),
                                    message,
                                });
                            }
                            if force {
                                issue.severity = Severity::Warning;
                            }
                        }
                        if issue.severity == Severity::Warning && policy.hides_warnings(check.name()) {
                            debug!("suppressed warning: {issue}");
                            continue;
                        }
                        report.record(issue);
                    }
                }
            }

            if scope == Scope::Commit {
                outcome.commit_ran = true;
            }
        }
        Ok(outcome)
    }
}
