// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use replcfg_lib::{
        cluster::Cluster,
        error::Report,
        fragments::{apply_fragments, load_fragments, parse_fragments},
        group::{Group, Member},
        store::PropertyStore,
        test_env::*,
    };

    const INI: &str = r#"
["alpha@db2"]
thl-port = 2115

[alpha]
members = "db1,db2"
master = "db1"

[defaults]
datasource-user = "tungsten"
thl-port = "2113"
"#;

    fn rs(alias: &str) -> Member {
        Member::new(Group::ReplicationServices, alias)
    }

    #[test]
    fn more_specific_fragments_apply_last() {
        let mut cluster = Cluster::new(
            PropertyStore::new(),
            mock_context(Arc::new(MockExecutor::new())),
        );
        let fragments = parse_fragments(INI).unwrap();

        let mut report = Report::new();
        apply_fragments(&mut cluster, &fragments, &mut report).unwrap();
        assert!(!report.has_errors(), "{:?}", report.issues());

        let resolver = cluster.resolver();
        assert_eq!(resolver.value(&rs("alpha_db1"), "thl_port").unwrap(), "2113");
        assert_eq!(resolver.value(&rs("alpha_db2"), "thl_port").unwrap(), "2115");
        assert_eq!(resolver.value(&rs("alpha_db2"), "role").unwrap(), "slave");
        assert_eq!(
            cluster
                .store()
                .get_string(&["repl_services", "alpha_db2", "thl_port"])
                .unwrap(),
            "2115"
        );
    }

    #[test]
    fn fragment_files_load_from_disk() {
        let env = TestEnvironment::new("fragment_files_load_from_disk").unwrap();
        let path = env.write("replcfg.ini", INI).unwrap();

        let fragments = load_fragments(&path).unwrap();
        let names: Vec<&str> = fragments.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["defaults", "alpha", "alpha@db2"]);
    }

    #[test]
    fn malformed_fragments_are_rejected() {
        assert!(parse_fragments("[alpha\nmembers = \"db1\"").is_err());
        assert!(load_fragments(std::path::Path::new("/nonexistent/replcfg.ini")).is_err());
    }
}
