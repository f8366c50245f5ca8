// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use replcfg_lib::{cluster::Cluster, error::ConfigError, store::PropertyStore, test_env::*};

    #[test]
    fn saved_configuration_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("deploy.json");

        let cluster = three_node_cluster(Arc::new(MockExecutor::new()));
        cluster.save(&path).unwrap();

        let loaded = Cluster::load(&path, mock_context(Arc::new(MockExecutor::new()))).unwrap();
        assert_eq!(loaded.store(), cluster.store());
        assert_eq!(loaded.dataservices(), vec!["alpha"]);
        assert!(!dir.path().join("conf").join("deploy.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_an_empty_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let store = PropertyStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let env = TestEnvironment::new("malformed_json_is_an_error").unwrap();
        let path = env.write("deploy.json", "{\"dataservices\": ").unwrap();
        assert!(matches!(PropertyStore::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn list_edits_keep_order_and_uniqueness() {
        let mut store = PropertyStore::from_value(json!({
            "dataservices": {"alpha": {"members": "db1,db2"}}
        }))
        .unwrap();
        let path = ["dataservices", "alpha", "members"];

        store.append(&path, &["db2".to_string(), "db3".to_string()]);
        assert_eq!(store.get_list(&path), vec!["db1", "db2", "db3"]);

        store.subtract(&path, &["db1".to_string()]);
        assert_eq!(store.get_string(&path).unwrap(), "db2,db3");
    }

    #[test]
    fn scratch_directories_are_removed_on_drop() {
        let env = TestEnvironment::new("scratch_directories_are_removed_on_drop").unwrap();
        env.write("deploy.json", "{}").unwrap();
        let dir = env.dir().to_path_buf();
        assert!(env.config_path().exists());

        drop(env);
        assert!(!dir.exists());
    }
}
