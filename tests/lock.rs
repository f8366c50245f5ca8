// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use replcfg_lib::{
        error::ConfigError,
        lock::{acquire, is_locked, records, refresh, Action},
    };

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn install_then_update() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_locked(dir.path()));
        assert!(records(dir.path()).unwrap().is_empty());

        let installed = acquire(dir.path(), &names(&["alpha"])).unwrap();
        assert_eq!(installed.action, Action::Install);
        assert!(is_locked(dir.path()));

        assert!(matches!(
            acquire(dir.path(), &names(&["alpha"])),
            Err(ConfigError::Locked(_))
        ));

        refresh(dir.path(), &names(&["alpha", "beta"])).unwrap();
        let history = records(dir.path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, Action::Install);
        assert_eq!(history[1].action, Action::Update);
        assert_eq!(history[1].dataservices, names(&["alpha", "beta"]));
    }

    #[test]
    fn update_requires_an_install() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            refresh(dir.path(), &names(&["alpha"])),
            Err(ConfigError::NotLocked(_))
        ));
        assert!(!is_locked(dir.path()));
    }

    #[test]
    fn corrupt_lock_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".replcfg.lock"), "garbage\n").unwrap();
        assert!(matches!(
            records(dir.path()),
            Err(ConfigError::Corrupt { .. })
        ));
    }
}
