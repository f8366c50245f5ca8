// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! store.rs
//!
//! The PropertyStore is the raw configuration tree. Paths are ordered segments such as
//! `["repl_services", "alpha_db1", "rmi_port"]`. Leaves are scalars, lists (JSON arrays or
//! comma-joined strings) or nested maps.

use std::{fs, path::Path};

use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyStore {
    root: Value,
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a leaf as the string form used by prompts. Lists become comma-joined.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Split a comma-joined list, trimming whitespace and dropping empty items.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => split_list(&value_to_string(other)),
    }
}

impl PropertyStore {
    pub fn new() -> Self {
        PropertyStore {
            root: Value::Object(Map::new()),
        }
    }

    pub fn from_value(root: Value) -> Result<Self> {
        match root {
            Value::Object(_) => Ok(PropertyStore { root }),
            Value::Null => Ok(Self::new()),
            _ => Err(ConfigError::corrupt(&[], "top level must be a map")),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Pretty JSON. Maps are sorted so equal trees serialize byte-identically.
    pub fn to_json(&self) -> String {
        // Serializing a Value cannot fail.
        serde_json::to_string_pretty(&self.root).unwrap_or_default()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.as_object().map_or(true, |m| m.is_empty())
    }

    /// Read a persisted configuration. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Self::new()),
            Ok(contents) => Self::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(ConfigError::io(path.display().to_string(), e)),
        }
    }

    /// Write the store as JSON. The contents go to a sibling temporary file which is then
    /// renamed over the destination, so readers never observe a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let display = path.display().to_string();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::io(&display, e))?;
            }
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        fs::write(&tmp, self.to_json() + "\n").map_err(|e| ConfigError::io(&display, e))?;
        fs::rename(&tmp, path).map_err(|e| ConfigError::io(&display, e))
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let mut node = &self.root;
        for seg in path {
            node = node.as_object()?.get(*seg)?;
        }
        Some(node)
    }

    pub fn get_or<'a>(&'a self, path: &[&str], default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// The string form of a leaf, or `None` when absent or null.
    pub fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get(path)? {
            Value::Null => None,
            v => Some(value_to_string(v)),
        }
    }

    pub fn get_list(&self, path: &[&str]) -> Vec<String> {
        self.get(path).map(value_to_list).unwrap_or_default()
    }

    pub fn get_map(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.get(path)?.as_object()
    }

    pub fn get_map_mut(&mut self, path: &[&str]) -> Option<&mut Map<String, Value>> {
        let mut node = &mut self.root;
        for seg in path {
            node = node.as_object_mut()?.get_mut(*seg)?;
        }
        node.as_object_mut()
    }

    /// Sorted child keys of the map at `path`.
    pub fn keys(&self, path: &[&str]) -> Vec<String> {
        self.get_map(path)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, path: &[&str]) -> bool {
        self.get(path).is_some()
    }

    /// Walk to `path`, creating maps as needed. A scalar met on the way is replaced.
    fn entry(&mut self, path: &[&str]) -> &mut Value {
        let mut node = &mut self.root;
        for seg in path {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = match node {
                Value::Object(map) => map
                    .entry(seg.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => unreachable!(),
            };
        }
        node
    }

    pub fn set(&mut self, path: &[&str], value: impl Into<Value>) {
        if path.is_empty() {
            return;
        }
        *self.entry(path) = value.into();
    }

    /// Remove the value at `path`, then drop any ancestor maps left empty. Returns the removed
    /// value.
    pub fn remove(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let removed = {
            let mut node = &mut self.root;
            for seg in parents {
                node = node.as_object_mut()?.get_mut(*seg)?;
            }
            node.as_object_mut()?.remove(*last)?
        };
        for depth in (1..parents.len() + 1).rev() {
            let prefix = &path[..depth];
            if self.get_map(prefix).is_some_and(|m| m.is_empty()) {
                let (last, parents) = prefix.split_last()?;
                let mut node = &mut self.root;
                for seg in parents {
                    node = node.as_object_mut()?.get_mut(*seg)?;
                }
                node.as_object_mut()?.remove(*last);
            } else {
                break;
            }
        }
        Some(removed)
    }

    /// Merge `map` into the subtree at `path`. Nested maps merge structurally; conflicting
    /// leaves take the value from `map`.
    pub fn override_with(&mut self, path: &[&str], map: &Map<String, Value>) {
        let target = self.entry(path);
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        deep_merge(target, map, true);
    }

    /// Merge `map` into the subtree at `path` without overwriting existing leaves.
    pub fn include(&mut self, path: &[&str], map: &Map<String, Value>) {
        let target = self.entry(path);
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        deep_merge(target, map, false);
    }

    /// Union `items` into the list at `path`, keeping first-seen order.
    pub fn append(&mut self, path: &[&str], items: &[String]) {
        let mut list = self.get_list(path);
        for item in items {
            if !list.contains(item) {
                list.push(item.clone());
            }
        }
        self.set(path, list.join(","));
    }

    /// Remove `items` from the list at `path`.
    pub fn subtract(&mut self, path: &[&str], items: &[String]) {
        let list: Vec<String> = self
            .get_list(path)
            .into_iter()
            .filter(|i| !items.contains(i))
            .collect();
        self.set(path, list.join(","));
    }
}

fn deep_merge(target: &mut Value, source: &Map<String, Value>, overwrite: bool) {
    let Value::Object(dest) = target else {
        return;
    };
    for (key, value) in source {
        match (dest.get_mut(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(inner)) => {
                deep_merge(existing, inner, overwrite);
            }
            (Some(existing), _) => {
                if overwrite {
                    *existing = value.clone();
                }
            }
            (None, _) => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_maps() {
        let mut store = PropertyStore::new();
        store.set(&["hosts", "db1", "host"], "db1");
        assert_eq!(store.get_string(&["hosts", "db1", "host"]).unwrap(), "db1");
        assert_eq!(store.keys(&["hosts"]), vec!["db1".to_string()]);
    }

    #[test]
    fn remove_prunes_empty_parents() {
        let mut store = PropertyStore::new();
        store.set(&["hosts", "db1", "host"], "db1");
        store.set(&["hosts", "defaults", "user"], "tungsten");
        store.remove(&["hosts", "db1", "host"]);
        assert!(!store.contains(&["hosts", "db1"]));
        assert!(store.contains(&["hosts", "defaults", "user"]));
    }

    #[test]
    fn override_merges_nested_maps_and_last_write_wins() {
        let mut store = PropertyStore::from_value(json!({
            "a": {"x": "1", "nested": {"keep": "yes", "swap": "old"}}
        }))
        .unwrap();
        let overlay = json!({"x": "2", "nested": {"swap": "new"}, "y": "3"});
        store.override_with(&["a"], overlay.as_object().unwrap());
        assert_eq!(
            store.root(),
            &json!({"a": {"x": "2", "y": "3", "nested": {"keep": "yes", "swap": "new"}}})
        );
    }

    #[test]
    fn include_does_not_overwrite() {
        let mut store = PropertyStore::from_value(json!({"a": {"x": "1"}})).unwrap();
        let overlay = json!({"x": "2", "y": "3"});
        store.include(&["a"], overlay.as_object().unwrap());
        assert_eq!(store.root(), &json!({"a": {"x": "1", "y": "3"}}));
    }

    #[test]
    fn append_unions_lists() {
        let mut store = PropertyStore::new();
        store.set(&["ds", "alpha", "members"], "h1, h2");
        store.append(&["ds", "alpha", "members"], &["h2".into(), "h3".into()]);
        assert_eq!(store.get_list(&["ds", "alpha", "members"]), vec!["h1", "h2", "h3"]);
        store.set(&["ds", "beta", "members"], json!(["h1"]));
        store.append(&["ds", "beta", "members"], &["h4".into()]);
        assert_eq!(store.get_string(&["ds", "beta", "members"]).unwrap(), "h1,h4");
    }

    #[test]
    fn get_or_never_fails() {
        let store = PropertyStore::new();
        let fallback = json!("x");
        assert_eq!(store.get_or(&["nope", "nothing"], &fallback), &fallback);
    }
}
