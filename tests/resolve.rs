// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use replcfg_lib::{cluster::ConfigureRequest, group::Member, test_env::*};

    const DETECT_TMP: &str = "echo ${TMPDIR";

    #[test]
    fn remote_defaults_are_computed_once() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("db1", DETECT_TMP, "/var/tmp\n");
        let cluster = three_node_cluster(Arc::clone(&mock));
        let db1 = Member::host("db1");

        {
            let resolver = cluster.resolver();
            assert_eq!(resolver.value(&db1, "temp_directory").unwrap(), "/var/tmp");
            assert_eq!(resolver.value(&db1, "temp_directory").unwrap(), "/var/tmp");
        }
        assert_eq!(
            cluster.resolver().value(&db1, "temp_directory").unwrap(),
            "/var/tmp"
        );
        assert_eq!(mock.call_count(Some("db1"), DETECT_TMP), 1);

        cluster.cache().invalidate_all();
        cluster.resolver().value(&db1, "temp_directory").unwrap();
        assert_eq!(mock.call_count(Some("db1"), DETECT_TMP), 2);
    }

    #[test]
    fn memoization_is_per_member() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("db2", DETECT_TMP, "/scratch");
        let cluster = three_node_cluster(Arc::clone(&mock));
        let resolver = cluster.resolver();

        // Unmatched commands answer empty, which falls back to /tmp.
        assert_eq!(resolver.value(&Member::host("db1"), "temp_directory").unwrap(), "/tmp");
        assert_eq!(resolver.value(&Member::host("db2"), "temp_directory").unwrap(), "/scratch");
        assert_eq!(mock.call_count(None, DETECT_TMP), 2);
        assert_eq!(cluster.cache().len(), 2);
    }

    #[test]
    fn reset_forgets_memoized_values() {
        let mock = Arc::new(MockExecutor::new());
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        let db1 = Member::host("db1");

        cluster.resolver().value(&db1, "temp_directory").unwrap();
        assert_eq!(cluster.cache().len(), 1);

        configure_ok(
            &mut cluster,
            ConfigureRequest::new("alpha")
                .reset()
                .set("members", "db1,db2")
                .set("master", "db1"),
        );
        assert!(cluster.cache().is_empty());
    }

    #[test]
    fn stored_values_bypass_the_remote_default() {
        let mock = Arc::new(MockExecutor::new());
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        configure_ok(
            &mut cluster,
            ConfigureRequest::new("alpha")
                .hosts(&["db3"])
                .set("tmp-directory", "/data/tmp"),
        );

        assert_eq!(
            cluster
                .resolver()
                .value(&Member::host("db3"), "temp_directory")
                .unwrap(),
            "/data/tmp"
        );
        assert_eq!(mock.call_count(None, DETECT_TMP), 0);
    }
}
