// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;

    use replcfg_lib::{
        cluster::Cluster,
        error::{ConfigError, IssueKind, Report},
        reconcile::reconcile,
        test_env::*,
    };

    const QUERY: &str = "/opt/replicator/replcfg query config";

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    fn svc1(master: &str) -> String {
        json!({
            "dataservices": {"svc1": {"members": "h1,h2", "master_host": master}},
            "hosts": {"h1": {"host": "h1"}, "h2": {"host": "h2"}},
            "repl_services": {
                "svc1_h1": {"deployment_dataservice": "svc1", "deployment_host": "h1"},
                "svc1_h2": {"deployment_dataservice": "svc1", "deployment_host": "h2"}
            }
        })
        .to_string()
    }

    fn empty_cluster(mock: &Arc<MockExecutor>) -> Cluster {
        cluster_from_json(json!({}), Arc::clone(mock))
    }

    #[test]
    fn disagreeing_hosts_conflict() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("h1", QUERY, &svc1("h1"));
        mock.respond("h2", QUERY, &svc1("h2"));
        let cluster = empty_cluster(&mock);

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["h1", "h2"]), &mut report).unwrap();

        assert_eq!(outcome.anchor.as_deref(), Some("h1"));
        assert_eq!(outcome.conflicts.len(), 1);
        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.section, "dataservices.svc1");
        assert_eq!(conflict.key, "master_host");
        assert_eq!((conflict.anchor.as_str(), conflict.other.as_str()), ("h1", "h2"));

        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, IssueKind::Conflict);
        assert!(errors[0].message.contains("h1") && errors[0].message.contains("h2"));
        assert!(errors[0].subject.contains("dataservices.svc1"));
    }

    #[test]
    fn explicit_default_host_wins_silently() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("h1", QUERY, &svc1("h1"));
        mock.respond("h2", QUERY, &svc1("h2"));
        let mut cluster = empty_cluster(&mock);
        cluster.context.default_host = Some("h2".to_string());

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["h1", "h2"]), &mut report).unwrap();

        assert!(!report.has_errors());
        assert_eq!(outcome.anchor.as_deref(), Some("h2"));
        assert_eq!(
            outcome
                .store
                .get_string(&["dataservices", "svc1", "master_host"])
                .unwrap(),
            "h2"
        );
        assert!(outcome.store.contains(&["repl_services", "svc1_h1"]));
        assert!(outcome.store.contains(&["hosts", "h1"]));
    }

    #[test]
    fn unreachable_hosts_are_dropped() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("h1", QUERY, &svc1("h1"));
        mock.fail_host("h2");
        mock.respond("h3", QUERY, "");
        let cluster = empty_cluster(&mock);

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["h1", "h2", "h3"]), &mut report).unwrap();

        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.warnings().next().unwrap().subject, "h2");
        assert_eq!(
            outcome
                .store
                .get_string(&["dataservices", "svc1", "master_host"])
                .unwrap(),
            "h1"
        );
    }

    #[test]
    fn no_reachable_host_is_fatal() {
        let mock = Arc::new(MockExecutor::new());
        mock.fail_host("h1");
        mock.fail_host("h2");
        let cluster = empty_cluster(&mock);

        let mut report = Report::new();
        match reconcile(&cluster, &hosts(&["h1", "h2"]), &mut report) {
            Err(ConfigError::AllHostsUnreachable(unreached)) => {
                assert_eq!(unreached, hosts(&["h1", "h2"]))
            }
            other => panic!("expected every host to be unreachable, got {other:?}"),
        }
    }

    #[test]
    fn slow_hosts_time_out() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("h1", QUERY, &svc1("h1"));
        mock.respond("h2", QUERY, &svc1("h2"));
        mock.delay_host("h2", Duration::from_secs(3));
        let mut cluster = empty_cluster(&mock);
        cluster.context.fetch_timeout = Duration::from_millis(300);

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["h1", "h2"]), &mut report).unwrap();

        assert!(!report.has_errors());
        assert_eq!(report.warnings().next().unwrap().subject, "h2");
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn legacy_hosts_are_migrated() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond(
            "db1",
            QUERY,
            r#"{"service_name": "alpha", "role": "master", "host": "db1", "thl_port": "2113"}"#,
        );
        mock.respond(
            "db2",
            QUERY,
            r#"{"service_name": "alpha", "role": "slave", "host": "db2", "master_host": "db1"}"#,
        );
        let cluster = empty_cluster(&mock);

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["db1", "db2"]), &mut report).unwrap();
        let store = &outcome.store;

        assert!(!report.has_errors());
        assert_eq!(outcome.anchor.as_deref(), Some("legacy"));
        assert_eq!(
            store.get_string(&["dataservices", "alpha", "master_host"]).unwrap(),
            "db1"
        );
        assert_eq!(
            store.get_string(&["dataservices", "alpha", "topology"]).unwrap(),
            "master-slave"
        );
        assert_eq!(
            store.get_string(&["repl_services", "alpha_db1", "thl_port"]).unwrap(),
            "2113"
        );
        assert_eq!(store.get_string(&["hosts", "db2", "host"]).unwrap(), "db2");
    }

    #[test]
    fn remote_defaults_fold_into_option_bags() {
        let mock = Arc::new(MockExecutor::new());
        let remote = json!({
            "dataservices": {"svc1": {"members": "h1", "master_host": "h1"}},
            "hosts": {"h1": {"host": "h1"}},
            "repl_services": {
                "defaults": {"datasource_user": "tungsten", "thl_port": "2200"},
                "svc1_h1": {"deployment_dataservice": "svc1", "deployment_host": "h1"}
            }
        });
        mock.respond("h1", QUERY, &remote.to_string());
        let cluster = cluster_from_json(
            json!({"repl_services": {"defaults": {"datasource_user": "tungsten"}}}),
            Arc::clone(&mock),
        );

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["h1"]), &mut report).unwrap();
        let store = &outcome.store;

        assert_eq!(
            store
                .get_string(&["dataservice_replication_options", "svc1", "thl_port"])
                .unwrap(),
            "2200"
        );
        assert!(!store.contains(&["dataservice_replication_options", "svc1", "datasource_user"]));
        assert!(!store.contains(&["repl_services", "defaults", "thl_port"]));
        assert_eq!(
            store
                .get_string(&["repl_services", "defaults", "datasource_user"])
                .unwrap(),
            "tungsten"
        );
    }

    #[test]
    fn repeated_hosts_are_queried_once() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("h1", QUERY, &svc1("h1"));
        mock.respond("h2", QUERY, &svc1("h1"));
        let cluster = empty_cluster(&mock);

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &hosts(&["h1", "h2", "h1"]), &mut report).unwrap();

        assert!(!report.has_errors());
        assert!(outcome.conflicts.is_empty());
        assert_eq!(mock.call_count(Some("h1"), QUERY), 1);
        assert_eq!(mock.call_count(Some("h2"), QUERY), 1);
    }

    #[test]
    fn no_hosts_keeps_the_local_configuration() {
        let mock = Arc::new(MockExecutor::new());
        let cluster = cluster_from_json(
            json!({
                "dataservices": {"svc1": {"members": "h1", "master_host": "h1"}},
                "hosts": {"h1": {"host": "h1"}},
                "repl_services": {
                    "svc1_h1": {"deployment_dataservice": "svc1", "deployment_host": "h1"}
                }
            }),
            Arc::clone(&mock),
        );

        let mut report = Report::new();
        let outcome = reconcile(&cluster, &[], &mut report).unwrap();

        assert!(report.issues().is_empty());
        assert_eq!(outcome.anchor, None);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(&outcome.store, cluster.store());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn queries_use_the_configured_user_and_port() {
        let mock = Arc::new(MockExecutor::new());
        mock.respond("h1", QUERY, &svc1("h1"));
        mock.respond("h2", QUERY, &svc1("h1"));
        let cluster = cluster_from_json(
            json!({
                "hosts": {
                    "h1": {"host": "h1", "ssh_port": "2222", "user": "repl"},
                    "h2": {"host": "h2"}
                }
            }),
            Arc::clone(&mock),
        );

        let mut report = Report::new();
        reconcile(&cluster, &hosts(&["h1", "h2"]), &mut report).unwrap();

        let h1 = mock.endpoints("h1");
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].port, 2222);
        assert_eq!(h1[0].user.as_deref(), Some("repl"));
        let h2 = mock.endpoints("h2");
        assert_eq!(h2[0].port, 22);
    }
}
