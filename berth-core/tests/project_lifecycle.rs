//! Integration tests for the full project lifecycle:
//! register, rescan, start validation, unregister.
//!
//! Tests use a temp data directory and a mock process probe for
//! portability; no Docker or network services are required.

use berth_core::{
    BerthError, Lifecycle, PortRange, ProcessProbe, Project, ProjectStatus, RegistryStore,
    StaticProbe,
};
use std::cell::RefCell;
use std::path::Path;
use tempfile::TempDir;

const RANGE: PortRange = PortRange { start: 5000, end: 5999 };

/// Probe whose answer can be flipped mid-test.
struct TogglingProbe {
    running: RefCell<Vec<String>>,
}

impl TogglingProbe {
    fn new() -> Self {
        Self { running: RefCell::new(Vec::new()) }
    }

    fn set_running(&self, hostname: &str) {
        self.running.borrow_mut().push(hostname.to_string());
    }

    fn set_stopped(&self, hostname: &str) {
        self.running.borrow_mut().retain(|h| h != hostname);
    }
}

impl ProcessProbe for TogglingProbe {
    fn is_running(&self, hostname: &str) -> bool {
        self.running.borrow().iter().any(|h| h == hostname)
    }
}

fn write_compose(dir: &Path, content: &str) {
    std::fs::write(dir.join("docker-compose.yml"), content).unwrap();
}

fn project_dir_with_compose(content: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_compose(dir.path(), content);
    dir
}

#[test]
fn register_scans_compose_and_derives_exposed_ports() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let project_dir = project_dir_with_compose(
        "services:\n  app:\n    ports:\n      - \"3000:3000\"\n  postgres:\n    ports:\n      - \"5432:5432\"\n",
    );

    let project: Project = lifecycle.register("proj1", project_dir.path()).unwrap();

    assert!(RANGE.contains(project.port));
    assert!(project.docker_compose);
    assert_eq!(project.services, vec!["app", "postgres"]);
    assert_eq!(project.service_ports.get("app"), Some(&3000));
    assert_eq!(project.service_ports.get("postgres"), Some(&5432));

    // exposed_ports is the sorted union of the allocated port and all
    // service ports
    let mut expected = vec![project.port, 3000, 5432];
    expected.sort_unstable();
    expected.dedup();
    assert_eq!(project.exposed_ports, expected);
    assert_eq!(project.status, ProjectStatus::Stopped);
}

#[test]
fn register_without_compose_file() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let project_dir = tempfile::tempdir().unwrap();
    let project = lifecycle.register("plain", project_dir.path()).unwrap();

    assert!(!project.docker_compose);
    assert!(project.services.is_empty());
    assert_eq!(project.exposed_ports, vec![project.port]);
}

#[test]
fn register_missing_path_fails() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let result = lifecycle.register("ghost", Path::new("/nonexistent/ghost"));
    assert!(matches!(result, Err(BerthError::PathNotFound { .. })));
}

#[test]
fn register_duplicate_hostname_fails() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let project_dir = tempfile::tempdir().unwrap();
    lifecycle.register("dup", project_dir.path()).unwrap();
    let result = lifecycle.register("dup", project_dir.path());
    assert!(matches!(result, Err(BerthError::DuplicateHostname { .. })));
}

#[test]
fn second_project_gets_distinct_port() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = lifecycle.register("a", dir_a.path()).unwrap();
    let b = lifecycle.register("b", dir_b.path()).unwrap();
    assert_ne!(a.port, b.port);
}

#[test]
fn start_validation_reports_conflict_against_running_project() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = TogglingProbe::new();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let compose = "services:\n  postgres:\n    ports:\n      - \"5432:5432\"\n";
    let dir1 = project_dir_with_compose(compose);
    let dir2 = project_dir_with_compose(compose);

    lifecycle.register("proj1", dir1.path()).unwrap();
    lifecycle.register("proj2", dir2.path()).unwrap();

    // proj1 comes up; starting proj2 must yield exactly one conflict
    probe.set_running("proj1");
    lifecycle.validate_start("proj1").unwrap();

    match lifecycle.validate_start("proj2") {
        Err(BerthError::PortConflict { conflicts }) => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].port, 5432);
            assert_eq!(conflicts[0].hostname, "proj1");
            assert_eq!(conflicts[0].service, "postgres");
        }
        other => panic!("Expected PortConflict, got {:?}", other),
    }

    // Once proj1 actually stops, the probe refresh clears the conflict
    probe.set_stopped("proj1");
    let started = lifecycle.validate_start("proj2").unwrap();
    assert_eq!(started.status, ProjectStatus::Running);
    assert!(started.last_started.is_some());
}

#[test]
fn stale_running_status_is_refreshed_before_conflict_check() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = TogglingProbe::new();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let compose = "services:\n  redis:\n    ports:\n      - \"6379:6379\"\n";
    let dir1 = project_dir_with_compose(compose);
    let dir2 = project_dir_with_compose(compose);

    lifecycle.register("stale", dir1.path()).unwrap();
    lifecycle.register("fresh", dir2.path()).unwrap();

    // Registry says running, but the probe knows the process died
    store.update_status("stale", ProjectStatus::Running).unwrap();
    lifecycle.validate_start("fresh").unwrap();

    assert_eq!(store.get("stale").unwrap().status, ProjectStatus::Stopped);
}

#[test]
fn apply_rescan_updates_metadata() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let project_dir =
        project_dir_with_compose("services:\n  web:\n    ports:\n      - \"8080:80\"\n");
    lifecycle.register("site", project_dir.path()).unwrap();

    // Compose file gains a service
    write_compose(
        project_dir.path(),
        "services:\n  web:\n    ports:\n      - \"8080:80\"\n  redis:\n    ports:\n      - \"6379:6379\"\n",
    );

    let diff = lifecycle.apply_rescan("site").unwrap();
    assert_eq!(diff.services_added, vec!["redis"]);
    assert_eq!(diff.ports_added.get("redis"), Some(&6379));

    let project = store.get("site").unwrap();
    assert_eq!(project.services, vec!["web", "redis"]);
    assert_eq!(project.service_ports.get("redis"), Some(&6379));
}

#[test]
fn apply_rescan_blocked_by_conflict() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::new(vec!["holder".to_string()]);
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let holder_dir =
        project_dir_with_compose("services:\n  redis:\n    ports:\n      - \"6379:6379\"\n");
    let mover_dir = tempfile::tempdir().unwrap();

    lifecycle.register("holder", holder_dir.path()).unwrap();
    store.update_status("holder", ProjectStatus::Running).unwrap();
    lifecycle.register("mover", mover_dir.path()).unwrap();

    // mover's compose file appears, claiming the port holder already runs on
    write_compose(
        mover_dir.path(),
        "services:\n  cache:\n    ports:\n      - \"6379:6379\"\n",
    );

    let result = lifecycle.apply_rescan("mover");
    assert!(matches!(result, Err(BerthError::PortConflict { .. })));

    // Gated apply: nothing was mutated
    let mover = store.get("mover").unwrap();
    assert!(mover.service_ports.is_empty());
    assert!(!mover.docker_compose);
}

#[test]
fn rescan_after_compose_removal() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let project_dir =
        project_dir_with_compose("services:\n  web:\n    ports:\n      - \"8080:80\"\n");
    lifecycle.register("site", project_dir.path()).unwrap();

    std::fs::remove_file(project_dir.path().join("docker-compose.yml")).unwrap();

    let diff = lifecycle.apply_rescan("site").unwrap();
    assert!(diff.compose_status_changed);
    assert_eq!(diff.services_removed, vec!["web"]);

    let project = store.get("site").unwrap();
    assert!(!project.docker_compose);
    assert!(project.services.is_empty());
    assert_eq!(project.exposed_ports, vec![project.port]);

    // Second rescan with no further change is empty
    let diff = lifecycle.rescan("site").unwrap();
    assert!(diff.is_empty());
}

#[test]
fn unregister_frees_the_port_for_reallocation() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let dir = tempfile::tempdir().unwrap();
    let first = lifecycle.register("one", dir.path()).unwrap();
    lifecycle.unregister("one").unwrap();

    let second = lifecycle.register("two", dir.path()).unwrap();
    assert_eq!(first.port, second.port);
}

#[test]
fn env_vars_round_trip() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = RegistryStore::open(data_dir.path()).unwrap();
    let probe = StaticProbe::default();
    let lifecycle = Lifecycle::new(&store, RANGE, &probe);

    let dir = tempfile::tempdir().unwrap();
    lifecycle.register("app", dir.path()).unwrap();

    let project = lifecycle.set_env("app", "DATABASE_URL", "postgres://localhost").unwrap();
    assert_eq!(
        project.environment_vars.get("DATABASE_URL"),
        Some(&"postgres://localhost".to_string())
    );

    let project = lifecycle.unset_env("app", "DATABASE_URL").unwrap();
    assert!(project.environment_vars.is_empty());
}
