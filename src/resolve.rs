// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! resolve.rs
//!
//! Demand-driven resolution of prompt values. A value is computed only when it is read, and
//! computing it may read other prompts of the same member, of another group, or the topology
//! of the member's dataservice.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
};

use log::debug;

use crate::{
    context::Context,
    error::{ConfigError, IssueKind, Issue, Report, Result, Severity},
    group::{to_alias, Group, Member, DEFAULTS, DEPLOYMENT_DATASERVICE, DEPLOYMENT_HOST},
    prompt::{Fallback, Prompt, PromptRegistry},
    remote::{Endpoint, DEFAULT_SSH_PORT},
    store::{split_list, PropertyStore},
    topology::Topology,
};

type CacheKey = (Group, String, String);

/// Memoized defaults, keyed by (group, alias, prompt). Outlives any single resolver so that a
/// side-effecting default is computed once per run; `--reset` invalidates it.
#[derive(Debug, Default)]
pub struct DefaultCache {
    values: RefCell<HashMap<CacheKey, String>>,
}

impl DefaultCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &CacheKey) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn insert(&self, key: CacheKey, value: String) {
        self.values.borrow_mut().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every memoized value.
    pub fn invalidate_all(&self) {
        self.values.borrow_mut().clear();
    }

    /// Forget the memoized values of one member.
    pub fn invalidate(&self, member: &Member) {
        self.values
            .borrow_mut()
            .retain(|(group, alias, _), _| !(*group == member.group && *alias == member.alias));
    }
}

/// The first dataservice, in group then alias order, with a service on `host_alias`. This is
/// the dataservice whose option bags apply to the host.
pub fn host_dataservice(store: &PropertyStore, host_alias: &str) -> Option<String> {
    Group::SERVICES.iter().find_map(|g| {
        store.keys(&[g.key()]).into_iter().find_map(|alias| {
            let host = store.get_string(&[g.key(), &alias, DEPLOYMENT_HOST])?;
            if host == host_alias {
                store.get_string(&[g.key(), &alias, DEPLOYMENT_DATASERVICE])
            } else {
                None
            }
        })
    })
}

pub struct Resolver<'a> {
    store: &'a PropertyStore,
    registry: &'a PromptRegistry,
    context: &'a Context,
    cache: &'a DefaultCache,
    /// The chain of values currently being computed, innermost last.
    stack: RefCell<Vec<String>>,
    topologies: RefCell<HashMap<String, Rc<Topology>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a PropertyStore,
        registry: &'a PromptRegistry,
        context: &'a Context,
        cache: &'a DefaultCache,
    ) -> Self {
        Resolver {
            store,
            registry,
            context,
            cache,
            stack: RefCell::new(Vec::new()),
            topologies: RefCell::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &'a PropertyStore {
        self.store
    }

    pub fn registry(&self) -> &'a PromptRegistry {
        self.registry
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    /// The topology of a dataservice. Built once per resolver; the store cannot change while
    /// a resolver borrows it.
    pub fn topology(&self, dataservice: &str) -> Rc<Topology> {
        if let Some(t) = self.topologies.borrow().get(dataservice) {
            return Rc::clone(t);
        }
        let topology = Rc::new(Topology::build(dataservice, self.store));
        self.topologies
            .borrow_mut()
            .insert(dataservice.to_string(), Rc::clone(&topology));
        topology
    }

    /// The dataservice a member belongs to. Service members name it explicitly; a host
    /// belongs to the first dataservice (in sorted order) that has a service on it.
    pub fn dataservice_of(&self, member: &Member) -> Option<String> {
        if member.is_defaults() {
            return None;
        }
        match member.group {
            Group::Dataservices => Some(member.alias.clone()),
            Group::Hosts => host_dataservice(self.store, &member.alias),
            _ => self
                .store
                .get_string(&member.path(DEPLOYMENT_DATASERVICE))
                .filter(|s| !s.is_empty()),
        }
    }

    /// The host alias a member runs on.
    pub fn host_of(&self, member: &Member) -> Option<String> {
        if member.is_defaults() {
            return None;
        }
        match member.group {
            Group::Hosts => Some(member.alias.clone()),
            Group::Dataservices => None,
            _ => self
                .store
                .get_string(&member.path(DEPLOYMENT_HOST))
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn host_member(&self, member: &Member) -> Option<Member> {
        self.host_of(member).map(Member::host)
    }

    /// The hostname of the host a member runs on, falling back to the alias.
    pub fn hostname_of(&self, member: &Member) -> Result<Option<String>> {
        match self.host_member(member) {
            Some(host) => {
                let name = self.value(&host, "host")?;
                Ok(Some(if name.is_empty() { host.alias } else { name }))
            }
            None => Ok(None),
        }
    }

    /// How to reach `host`: its hostname with the configured login user and SSH port.
    pub fn endpoint(&self, host: &Member) -> Result<Endpoint> {
        let name = self.value(host, "host")?;
        let name = if name.is_empty() { host.alias.clone() } else { name };
        self.endpoint_for(host, &name)
    }

    /// Like `endpoint`, for a hostname the local configuration may not know yet.
    pub fn endpoint_for(&self, host: &Member, hostname: &str) -> Result<Endpoint> {
        let port = self.value(host, "ssh_port")?;
        let port = port.parse::<u16>().unwrap_or_else(|_| {
            debug!("ignoring ssh port '{port}' for {hostname}");
            DEFAULT_SSH_PORT
        });
        Ok(Endpoint::new(hostname)
            .user(self.value(host, "user")?)
            .port(port))
    }

    pub fn bool_value(&self, member: &Member, name: &str) -> Result<bool> {
        Ok(self.value(member, name)? == "true")
    }

    pub fn list_value(&self, member: &Member, name: &str) -> Result<Vec<String>> {
        Ok(split_list(&self.value(member, name)?))
    }

    /// The resolved value of prompt `name` for `member`.
    pub fn value(&self, member: &Member, name: &str) -> Result<String> {
        let prompt = self.registry.require(member.group, name)?;
        let key = format!("{member}.{name}");

        if self.stack.borrow().contains(&key) {
            let mut chain = self.stack.borrow().clone();
            chain.push(key);
            return Err(ConfigError::CircularDependency(chain));
        }

        self.stack.borrow_mut().push(key);
        let result = self.compute(prompt, member);
        self.stack.borrow_mut().pop();
        result
    }

    fn coerce(prompt: &Prompt, raw: String) -> String {
        // Values that fail validation are kept as-is; the validation pipeline reports them.
        prompt.validator.coerce(&raw).unwrap_or(raw)
    }

    fn compute(&self, prompt: &Prompt, member: &Member) -> Result<String> {
        let group = member.group.key();

        if let Some(raw) = self.store.get_string(&member.path(prompt.name)) {
            return Ok(Self::coerce(prompt, raw));
        }

        if member.is_defaults() {
            return Ok(match prompt.get_fallback() {
                Fallback::Constant(c) => c.to_string(),
                _ => String::new(),
            });
        }

        if !prompt.is_enabled(self, member)? {
            return Ok(prompt.get_disabled_value().to_string());
        }

        if let Some(derived) = prompt.get_derived() {
            if let Some(value) = derived(self, member)? {
                return Ok(value);
            }
        }

        if let (Some(bag), Some(ds)) = (member.group.options_key(), self.dataservice_of(member)) {
            if let Some(raw) = self.store.get_string(&[bag, &ds, prompt.name]) {
                return Ok(Self::coerce(prompt, raw));
            }
        }

        if let Some(raw) = self.store.get_string(&[group, DEFAULTS, prompt.name]) {
            return Ok(Self::coerce(prompt, raw));
        }

        match prompt.get_fallback() {
            Fallback::None => Ok(String::new()),
            Fallback::Constant(c) => Ok(c.to_string()),
            Fallback::Compute(f) => {
                let key = (member.group, member.alias.clone(), prompt.name.to_string());
                if prompt.is_memoized() {
                    if let Some(cached) = self.cache.get(&key) {
                        return Ok(cached);
                    }
                }
                let value = f(self, member)?.unwrap_or_default();
                if prompt.is_memoized() {
                    debug!("memoizing {member}.{} = '{value}'", prompt.name);
                    self.cache.insert(key, value.clone());
                }
                Ok(value)
            }
        }
    }

    /// Whether `name` is enabled for `member`.
    pub fn is_enabled(&self, member: &Member, name: &str) -> Result<bool> {
        self.registry.require(member.group, name)?.is_enabled(self, member)
    }

    /// Resolve `name` and record a resolution error into `report` when it is enabled,
    /// required and empty.
    pub fn require(&self, member: &Member, name: &str, report: &mut Report) -> Result<String> {
        let prompt = self.registry.require(member.group, name)?;
        let value = self.value(member, name)?;
        if value.is_empty() && prompt.is_enabled(self, member)? && prompt.is_required(self, member)? {
            report.record(self.missing_issue(prompt, member)?);
        }
        Ok(value)
    }

    fn missing_issue(&self, prompt: &Prompt, member: &Member) -> Result<Issue> {
        Ok(Issue {
            severity: Severity::Error,
            kind: IssueKind::Resolution,
            host: self.hostname_of(member)?,
            alias: Some(member.alias.clone()),
            subject: prompt.binding.flag.clone(),
            message: format!(
                "a value for {} is required ({})",
                prompt.binding.flag, prompt.description
            ),
        })
    }

    /// Every required prompt of `member` that resolves empty.
    pub fn missing_required(&self, member: &Member) -> Result<Vec<Issue>> {
        let mut missing = Vec::new();
        for prompt in self.registry.group(member.group) {
            if !prompt.is_enabled(self, member)? || !prompt.is_required(self, member)? {
                continue;
            }
            if self.value(member, prompt.name)?.is_empty() {
                missing.push(self.missing_issue(prompt, member)?);
            }
        }
        Ok(missing)
    }

    /// Every prompt of `member` with its resolved value.
    pub fn resolve_all(&self, member: &Member) -> Result<Vec<(&'static str, String)>> {
        self.registry
            .group(member.group)
            .map(|p| Ok((p.name, self.value(member, p.name)?)))
            .collect()
    }

    /// Aliases of every real member of `group` in the store.
    pub fn members(&self, group: Group) -> Vec<Member> {
        self.store
            .keys(&[group.key()])
            .into_iter()
            .filter(|a| a != DEFAULTS)
            .map(|a| Member::new(group, a))
            .collect()
    }

    pub fn host_by_name(&self, hostname: &str) -> Member {
        Member::host(to_alias(hostname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Prompt, Validator};
    use serde_json::json;

    fn left(r: &Resolver, m: &Member) -> Result<Option<String>> {
        Ok(Some(r.value(m, "right")?))
    }

    fn right(r: &Resolver, m: &Member) -> Result<Option<String>> {
        Ok(Some(r.value(m, "left")?))
    }

    #[test]
    fn cycles_are_detected() {
        let mut registry = PromptRegistry::new();
        registry.register(Prompt::new(Group::Hosts, "left", Validator::Text).default_fn(left));
        registry.register(Prompt::new(Group::Hosts, "right", Validator::Text).default_fn(right));
        let store = PropertyStore::from_value(json!({"hosts": {"h1": {"host": "h1"}}})).unwrap();
        let context = Context::default();
        let cache = DefaultCache::new();
        let resolver = Resolver::new(&store, &registry, &context, &cache);

        match resolver.value(&Member::host("h1"), "left") {
            Err(ConfigError::CircularDependency(chain)) => {
                assert_eq!(chain, vec!["hosts.h1.left", "hosts.h1.right", "hosts.h1.left"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_prompts_are_errors() {
        let registry = PromptRegistry::standard();
        let store = PropertyStore::new();
        let context = Context::default();
        let cache = DefaultCache::new();
        let resolver = Resolver::new(&store, &registry, &context, &cache);
        assert!(matches!(
            resolver.value(&Member::host("h1"), "nope"),
            Err(ConfigError::UnknownPrompt(_))
        ));
    }
}
