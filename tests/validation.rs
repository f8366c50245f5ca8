// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use replcfg_lib::{
        cluster::{Cluster, ConfigureRequest},
        error::{ConfigError, IssueKind, Report, Result},
        test_env::*,
        validation::{CheckRegistry, Pipeline, Scope, ValidationOutcome},
    };

    fn validate(cluster: &Cluster, report: &mut Report) -> Result<ValidationOutcome> {
        let registry = CheckRegistry::standard();
        let resolver = cluster.resolver();
        Pipeline::new(&registry).run(&resolver, &Scope::ORDER, report)
    }

    #[test]
    fn healthy_cluster_passes_every_scope() {
        let mock = Arc::new(MockExecutor::healthy());
        let cluster = three_node_cluster(Arc::clone(&mock));

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();

        assert!(report.issues().is_empty(), "{:?}", report.issues());
        assert!(outcome.commit_ran);
        assert!(outcome.ran.contains(&"ReleaseDirectoryCheck@db3".to_string()));
        assert_eq!(mock.call_count(None, "mkdir -p"), 3);
    }

    #[test]
    fn fatal_check_stops_the_pipeline() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.fail_host("db2");
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        cluster.context.force = true;

        let mut report = Report::new();
        match validate(&cluster, &mut report) {
            Err(ConfigError::FatalCheck { check, .. }) => assert_eq!(check, "SshLoginCheck"),
            other => panic!("expected a fatal check failure, got {other:?}"),
        }

        assert_eq!(report.error_count(), 1);
        assert_eq!(mock.call_count(Some("db3"), "whoami"), 0);
        assert_eq!(mock.call_count(None, "test -d"), 0);
        assert_eq!(mock.call_count(None, "mkdir -p"), 0);
    }

    #[test]
    fn errors_skip_the_commit_scope() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db2", "test -d", "");
        let cluster = three_node_cluster(Arc::clone(&mock));

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();

        assert_eq!(report.error_count(), 1);
        let error = report.errors().next().unwrap();
        assert_eq!(error.subject, "TempDirectoryWritableCheck");
        assert_eq!(error.host.as_deref(), Some("db2"));
        assert_eq!(error.kind, IssueKind::Validation);
        assert!(!outcome.commit_ran);
        assert_eq!(mock.call_count(None, "mkdir -p"), 0);
    }

    #[test]
    fn force_demotes_non_fatal_errors() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db2", "test -d", "");
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        cluster.context.force = true;

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();

        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 1);
        assert!(outcome.commit_ran);
    }

    #[test]
    fn enable_beats_skip() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db2", "test -d", "");
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        cluster.context.skip_checks = vec!["TempDirectoryWritableCheck".to_string()];

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();
        assert!(!report.has_errors());
        assert!(outcome
            .skipped
            .contains(&"TempDirectoryWritableCheck@db2".to_string()));

        cluster.context.enable_checks = vec!["tempdirectorywritablecheck".to_string()];
        let mut report = Report::new();
        validate(&cluster, &mut report).unwrap();
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn host_prompts_can_skip_checks() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db2", "test -d", "");
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        configure_ok(
            &mut cluster,
            ConfigureRequest::new("alpha")
                .hosts(&["db2"])
                .set("skip-validation-check", "TempDirectoryWritableCheck"),
        );

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();
        assert!(!report.has_errors());
        assert!(outcome
            .ran
            .contains(&"TempDirectoryWritableCheck@db1".to_string()));
        assert!(outcome
            .skipped
            .contains(&"TempDirectoryWritableCheck@db2".to_string()));
    }

    #[test]
    fn warnings_can_be_suppressed() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db1", "whoami", "someone-else");
        let mut cluster = three_node_cluster(Arc::clone(&mock));

        let mut report = Report::new();
        validate(&cluster, &mut report).unwrap();
        assert_eq!(report.warning_count(), 1);

        cluster.context.skip_warnings = vec!["SshLoginCheck".to_string()];
        let mut report = Report::new();
        validate(&cluster, &mut report).unwrap();
        assert_eq!(report.warning_count(), 0);

        cluster.context.enable_warnings = vec!["SshLoginCheck".to_string()];
        let mut report = Report::new();
        validate(&cluster, &mut report).unwrap();
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn post_checks_compare_published_facts() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db3", "getent hosts db1", "10.9.9.9 db1");
        let cluster = three_node_cluster(Arc::clone(&mock));

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();

        assert_eq!(outcome.facts.get("db3", "address:db1"), Some("10.9.9.9"));
        assert_eq!(outcome.facts.get("db2", "address:db1"), Some("10.0.0.1"));
        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].subject, "ConsistentAddressesCheck");
        assert!(errors[0].message.contains("db3: 10.9.9.9"));
        assert!(!outcome.commit_ran);
    }

    #[test]
    fn local_checks_catch_structural_mistakes() {
        let mock = Arc::new(MockExecutor::healthy());
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        let mut report = Report::new();
        cluster
            .configure(
                &ConfigureRequest::new("alpha")
                    .hosts(&["db1"])
                    .set("mgr-rmi-port", "10000"),
                &mut report,
            )
            .unwrap();
        assert!(!report.has_errors());

        let registry = CheckRegistry::standard();
        let resolver = cluster.resolver();
        Pipeline::new(&registry)
            .run(&resolver, &[Scope::Local], &mut report)
            .unwrap();

        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].subject, "PortConflictCheck");
        assert_eq!(errors[0].host.as_deref(), Some("db1"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn dataservice_prompts_can_skip_checks() {
        let mock = Arc::new(MockExecutor::healthy());
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        configure_ok(
            &mut cluster,
            ConfigureRequest::new("beta")
                .set("members", "db4,db5")
                .set("master", "db4"),
        );
        configure_ok(
            &mut cluster,
            ConfigureRequest::new("alpha")
                .set("dataservice-skip-validation-check", "MasterInMembersCheck"),
        );

        let registry = CheckRegistry::standard();
        let resolver = cluster.resolver();
        let mut report = Report::new();
        let outcome = Pipeline::new(&registry)
            .run(&resolver, &[Scope::Local], &mut report)
            .unwrap();

        assert!(!report.has_errors(), "{:?}", report.issues());
        assert!(outcome
            .skipped
            .contains(&"MasterInMembersCheck@alpha".to_string()));
        assert!(outcome.ran.contains(&"MasterInMembersCheck@beta".to_string()));
        // Host checks still run on alpha's hosts.
        assert!(outcome.ran.contains(&"PortConflictCheck@db1".to_string()));
    }

    #[test]
    fn remote_commands_use_the_host_user_and_port() {
        let mock = Arc::new(MockExecutor::healthy());
        mock.respond("db2", "whoami", "repl");
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        configure_ok(
            &mut cluster,
            ConfigureRequest::new("alpha")
                .hosts(&["db2"])
                .set("ssh-port", "2222")
                .set("install-user", "repl"),
        );

        let registry = CheckRegistry::standard();
        let resolver = cluster.resolver();
        let mut report = Report::new();
        Pipeline::new(&registry)
            .run(&resolver, &[Scope::Remote], &mut report)
            .unwrap();

        let db2 = mock.endpoints("db2");
        assert!(!db2.is_empty());
        for endpoint in &db2 {
            assert_eq!(endpoint.port, 2222);
            assert_eq!(endpoint.user.as_deref(), Some("repl"));
        }
        let db1 = mock.endpoints("db1");
        assert!(!db1.is_empty());
        assert!(db1.iter().all(|e| e.port == 22));
    }

    #[test]
    fn disagreeing_ping_methods_are_reported_once() {
        let mock = Arc::new(MockExecutor::healthy());
        let mut cluster = three_node_cluster(Arc::clone(&mock));
        configure_ok(
            &mut cluster,
            ConfigureRequest::new("alpha")
                .hosts(&["db2"])
                .set("ping-method", "echo"),
        );

        let mut report = Report::new();
        let outcome = validate(&cluster, &mut report).unwrap();

        assert_eq!(outcome.facts.get("db1", "ping_method:alpha"), Some("ping"));
        assert_eq!(outcome.facts.get("db2", "ping_method:alpha"), Some("echo"));
        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert_eq!(errors[0].subject, "ConsistentPingMethodCheck");
        assert_eq!(errors[0].host, None);
        assert_eq!(errors[0].alias, None);
        assert!(errors[0].message.contains("manager ping method of alpha"));
        assert!(errors[0].message.contains("db2: echo"));
        assert!(!outcome.commit_ran);
    }
}
