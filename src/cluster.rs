// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::path::Path;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::{
    context::Context,
    error::{IssueKind, Report, Result},
    group::{
        service_alias, to_alias, Group, Member, DEFAULTS, DEPLOYMENT_DATASERVICE, DEPLOYMENT_HOST,
    },
    prompt::{Prompt, PromptRegistry, Validator},
    reconcile::prune::{clean_cluster_configuration, PruneSummary},
    resolve::{DefaultCache, Resolver},
    settings::{Setting, SettingOp},
    store::{split_list, PropertyStore},
    topology::Topology,
};

/// One `configure` invocation: a target (a dataservice alias, or `defaults`), an optional
/// restriction to specific hosts, and the settings to apply.
#[derive(Debug, Clone, Default)]
pub struct ConfigureRequest {
    pub target: String,
    pub hosts: Vec<String>,
    pub reset: bool,
    pub settings: Vec<Setting>,
}

impl ConfigureRequest {
    pub fn new(target: impl Into<String>) -> Self {
        ConfigureRequest {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn hosts(mut self, hosts: &[&str]) -> Self {
        self.hosts = hosts.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn reset(mut self) -> Self {
        self.reset = true;
        self
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.settings.push(Setting::set(key, value));
        self
    }

    pub fn append(mut self, key: &str, value: &str) -> Self {
        self.settings.push(Setting::new(key, SettingOp::Append, value));
        self
    }

    pub fn subtract(mut self, key: &str, value: &str) -> Self {
        self.settings.push(Setting::new(key, SettingOp::Subtract, value));
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.settings.push(Setting::new(key, SettingOp::Remove, ""));
        self
    }

    fn is_defaults(&self) -> bool {
        self.target == DEFAULTS
    }
}

/// A cluster configuration held in memory for one invocation: the raw store together with the
/// prompt registry, run context and memoized defaults used to resolve it.
pub struct Cluster {
    store: PropertyStore,
    registry: PromptRegistry,
    pub context: Context,
    cache: DefaultCache,
}

impl Cluster {
    pub fn new(store: PropertyStore, context: Context) -> Self {
        Cluster {
            store,
            registry: PromptRegistry::standard(),
            context,
            cache: DefaultCache::new(),
        }
    }

    /// Load the persisted configuration at `path`. A missing file is an empty cluster.
    pub fn load(path: &Path, context: Context) -> Result<Self> {
        let store = PropertyStore::load(path)?;
        debug!("loaded configuration from '{}'", path.display());
        Ok(Self::new(store, context))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.store.save(path)?;
        info!("wrote configuration to '{}'", path.display());
        Ok(())
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PropertyStore {
        &mut self.store
    }

    pub fn replace_store(&mut self, store: PropertyStore) {
        self.store = store;
        self.cache.invalidate_all();
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &DefaultCache {
        &self.cache
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.store, &self.registry, &self.context, &self.cache)
    }

    pub fn dataservices(&self) -> Vec<String> {
        self.store
            .keys(&[Group::Dataservices.key()])
            .into_iter()
            .filter(|ds| ds != DEFAULTS)
            .collect()
    }

    pub fn topology(&self, dataservice: &str) -> Topology {
        Topology::build(dataservice, &self.store)
    }

    /// Hostnames of every configured host.
    pub fn hostnames(&self) -> Vec<String> {
        let g = Group::Hosts.key();
        self.store
            .keys(&[g])
            .into_iter()
            .filter(|alias| alias != DEFAULTS)
            .map(|alias| self.store.get_string(&[g, &alias, "host"]).unwrap_or(alias))
            .collect()
    }

    /// Apply a `configure` request, then create the entities the new structure calls for and
    /// prune the result. Invalid values are recorded in `report`; they never abort the request.
    pub fn configure(&mut self, request: &ConfigureRequest, report: &mut Report) -> Result<()> {
        if !request.is_defaults() {
            if let Err(message) = Validator::Identifier.coerce(&request.target) {
                report.error(IssueKind::InvalidValue, "dataservice", message);
                return Ok(());
            }
        }

        if request.reset {
            self.reset(&request.target);
        }

        if !request.is_defaults() {
            let path = [Group::Dataservices.key(), request.target.as_str()];
            if !self.store.contains(&path) {
                self.store.set(&path, Value::Object(Map::new()));
            }
        }

        for setting in &request.settings {
            self.apply_setting(request, setting, report)?;
        }

        self.synthesize();
        self.prune();
        Ok(())
    }

    /// Remove a dataservice and everything that only existed because of it.
    pub fn delete_dataservice(&mut self, dataservice: &str) -> PruneSummary {
        self.store.remove(&[Group::Dataservices.key(), dataservice]);
        self.cache.invalidate_all();
        self.prune()
    }

    pub fn prune(&mut self) -> PruneSummary {
        clean_cluster_configuration(&mut self.store)
    }

    /// Forget everything configured for `target` so a request can start over.
    fn reset(&mut self, target: &str) {
        debug!("resetting configuration of '{target}'");
        if target == DEFAULTS {
            for group in Group::ALL {
                self.store.remove(&[group.key(), DEFAULTS]);
            }
        } else {
            self.store.remove(&[Group::Dataservices.key(), target]);
            for bag in Group::option_sections() {
                self.store.remove(&[bag, target]);
            }
            for group in Group::SERVICES {
                for alias in self.store.keys(&[group.key()]) {
                    let ds = self
                        .store
                        .get_string(&[group.key(), &alias, DEPLOYMENT_DATASERVICE]);
                    if ds.as_deref() == Some(target) {
                        self.store.remove(&[group.key(), &alias]);
                    }
                }
            }
        }
        self.cache.invalidate_all();
    }

    /// The store paths a setting of `prompt` lands in for this request.
    fn destinations(&self, request: &ConfigureRequest, prompt: &Prompt) -> Vec<Vec<String>> {
        let group = prompt.group;
        let name = prompt.name.to_string();

        if group == Group::Dataservices {
            return vec![vec![group.key().into(), request.target.clone(), name]];
        }

        if request.hosts.is_empty() {
            return match group.options_key() {
                Some(bag) if !request.is_defaults() => {
                    vec![vec![bag.into(), request.target.clone(), name]]
                }
                _ => vec![vec![group.key().into(), DEFAULTS.into(), name]],
            };
        }

        let mut paths = Vec::new();
        for host in &request.hosts {
            let host_alias = to_alias(host);
            match group {
                Group::Hosts => paths.push(vec![group.key().into(), host_alias, name.clone()]),
                _ if !request.is_defaults() => paths.push(vec![
                    group.key().into(),
                    service_alias(&request.target, host),
                    name.clone(),
                ]),
                _ => {
                    for alias in self.store.keys(&[group.key()]) {
                        let on_host = self
                            .store
                            .get_string(&[group.key(), &alias, DEPLOYMENT_HOST])
                            .as_deref()
                            == Some(host_alias.as_str());
                        if on_host {
                            paths.push(vec![group.key().into(), alias, name.clone()]);
                        }
                    }
                }
            }
        }
        paths
    }

    /// The current value behind `path`, used as the starting point of `+=` and `-=`. A member
    /// path resolves through the whole default chain; other paths read the store.
    fn current_list(&self, path: &[&str]) -> Result<Vec<String>> {
        if self.store.contains(path) {
            return Ok(self.store.get_list(path));
        }
        if let [group, alias, name] = path {
            if let Some(group) = Group::from_key(group) {
                if *alias != DEFAULTS {
                    let member = Member::new(group, *alias);
                    return Ok(split_list(&self.resolver().value(&member, name)?));
                }
            }
        }
        Ok(Vec::new())
    }

    fn apply_setting(
        &mut self,
        request: &ConfigureRequest,
        setting: &Setting,
        report: &mut Report,
    ) -> Result<()> {
        let Some(prompt) = self.registry.lookup(&setting.key) else {
            report.error(
                IssueKind::InvalidValue,
                format!("--{}", setting.key),
                "unknown option",
            );
            return Ok(());
        };
        let is_list = prompt.validator.is_list();
        let paths = self.destinations(request, prompt);

        let value = match setting.op {
            SettingOp::Remove => None,
            SettingOp::Append | SettingOp::Subtract if !is_list => {
                report.error(
                    IssueKind::InvalidValue,
                    prompt.binding.flag.clone(),
                    "only list options accept += and -=",
                );
                return Ok(());
            }
            _ => match prompt.accept(&setting.value, report) {
                Some(value) => Some(value),
                None => return Ok(()),
            },
        };

        for path in paths {
            let path: Vec<&str> = path.iter().map(String::as_str).collect();
            match (setting.op, &value) {
                (SettingOp::Remove, _) => {
                    self.store.remove(&path);
                }
                (SettingOp::Set, Some(value)) => self.store.set(&path, value.as_str()),
                (op, Some(value)) => {
                    let items = split_list(value);
                    let mut list = self.current_list(&path)?;
                    if op == SettingOp::Append {
                        for item in items {
                            if !list.contains(&item) {
                                list.push(item);
                            }
                        }
                    } else {
                        list.retain(|i| !items.contains(i));
                    }
                    self.store.set(&path, list.join(","));
                }
                (_, None) => {}
            }
            debug!("{} {:?} {}", path.join("."), setting.op, setting.value);
        }

        if prompt.group == Group::Hosts {
            for host in &request.hosts {
                let path = [Group::Hosts.key(), &to_alias(host), "host"];
                if !self.store.contains(&path) {
                    self.store.set(&path, host.as_str());
                }
            }
        }
        Ok(())
    }

    /// Create the host and service entries that the dataservice structure calls for. Existing
    /// entries keep their values; entries that are no longer called for are left to pruning.
    pub fn synthesize(&mut self) {
        let mut wanted: Vec<(Group, String, String)> = Vec::new();
        for ds in self.dataservices() {
            let topology = Topology::build(&ds, &self.store);
            for host in topology.replication_hosts() {
                wanted.push((Group::ReplicationServices, ds.clone(), host));
            }
            for host in topology.manager_hosts() {
                wanted.push((Group::Managers, ds.clone(), host));
            }
            for host in topology.connectors() {
                wanted.push((Group::Connectors, ds.clone(), host));
            }
        }

        for (group, ds, host) in wanted {
            let alias = service_alias(&ds, &host);
            let member = Member::new(group, alias);
            self.store
                .set(&member.path(DEPLOYMENT_DATASERVICE), ds.as_str());
            self.store
                .set(&member.path(DEPLOYMENT_HOST), to_alias(&host));

            let host_path = [Group::Hosts.key(), &to_alias(&host), "host"];
            if !self.store.contains(&host_path) {
                self.store.set(&host_path, host.as_str());
            }
        }
    }
}
