// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::collections::HashMap;

use crate::{
    error::{ConfigError, Result},
    group::Group,
};

use super::{bare_flag, Prompt};

/// Every prompt known to a run. Catalogues add themselves through their `register()`
/// functions; nothing registers implicitly.
#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: Vec<Prompt>,
    index: HashMap<(Group, &'static str), usize>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with every built-in catalogue.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        super::dataservices::register(&mut registry);
        super::hosts::register(&mut registry);
        super::replication::register(&mut registry);
        super::managers::register(&mut registry);
        super::connectors::register(&mut registry);
        registry
    }

    /// Add a prompt. A prompt with the same group and name replaces the earlier one.
    pub fn register(&mut self, prompt: Prompt) {
        let key = (prompt.group, prompt.name);
        match self.index.get(&key) {
            Some(&i) => self.prompts[i] = prompt,
            None => {
                self.index.insert(key, self.prompts.len());
                self.prompts.push(prompt);
            }
        }
    }

    pub fn get(&self, group: Group, name: &str) -> Option<&Prompt> {
        self.prompts
            .iter()
            .find(|p| p.group == group && p.name == name)
    }

    pub fn require(&self, group: Group, name: &str) -> Result<&Prompt> {
        self.get(group, name)
            .ok_or_else(|| ConfigError::UnknownPrompt(format!("{group}.{name}")))
    }

    pub fn group(&self, group: Group) -> impl Iterator<Item = &Prompt> {
        self.prompts.iter().filter(move |p| p.group == group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.iter()
    }

    /// Find the prompt a command-line key refers to. `key` may be a flag (with or without
    /// dashes) or a prompt name; flags are checked first.
    pub fn lookup(&self, key: &str) -> Option<&Prompt> {
        self.prompts
            .iter()
            .find(|p| p.binding.matches(key))
            .or_else(|| {
                let name = bare_flag(key);
                self.prompts.iter().find(|p| p.name == name)
            })
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn standard_flags_are_unique() {
        let registry = PromptRegistry::standard();
        let mut seen = HashSet::new();
        for prompt in registry.iter() {
            assert!(
                seen.insert(bare_flag(&prompt.binding.flag).to_string()),
                "duplicate flag {}",
                prompt.binding.flag
            );
            for alias in &prompt.binding.aliases {
                assert!(seen.insert(bare_flag(alias).to_string()), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn lookup_by_flag_or_name() {
        let registry = PromptRegistry::standard();
        assert_eq!(registry.lookup("--members").unwrap().group, Group::Dataservices);
        assert_eq!(registry.lookup("rmi_port").unwrap().group, Group::ReplicationServices);
        assert!(registry.lookup("--no-such-thing").is_none());
    }
}
