//! Project records and the structures derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Lifecycle status of a project.
///
/// Reflects the last-observed state, not necessarily current truth.
/// Callers must refresh against the live process collaborator before
/// trusting it for conflict decisions involving other processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Stopped,
    Running,
    Error,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Stopped => write!(f, "stopped"),
            ProjectStatus::Running => write!(f, "running"),
            ProjectStatus::Error => write!(f, "error"),
        }
    }
}

/// A registered development project.
///
/// Identity is `hostname`: globally unique and immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique hostname (e.g. "my-app", reachable as my-app.test)
    pub hostname: String,

    /// Absolute path to the project source tree
    pub path: PathBuf,

    /// Primary HTTP port, assigned once from the allocation range
    pub port: u16,

    /// Service names from the compose file, in file order
    #[serde(default)]
    pub services: Vec<String>,

    /// Host port published by each service; services without a
    /// host-published port are absent
    #[serde(default)]
    pub service_ports: BTreeMap<String, u16>,

    /// Sorted union of `port` and `service_ports` values. Derived,
    /// recomputed on every relevant mutation, never hand-edited.
    #[serde(default)]
    pub exposed_ports: Vec<u16>,

    /// Whether a compose file was present at last scan
    #[serde(default)]
    pub docker_compose: bool,

    /// Project-scoped environment variables
    #[serde(default)]
    pub environment_vars: BTreeMap<String, String>,

    pub registered_at: DateTime<Utc>,

    #[serde(default)]
    pub last_started: Option<DateTime<Utc>>,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub last_status_change: Option<DateTime<Utc>>,

    pub status: ProjectStatus,
}

impl Project {
    /// Create a freshly registered project with no compose metadata.
    pub fn new(hostname: String, path: PathBuf, port: u16) -> Self {
        let now = Utc::now();
        let mut project = Self {
            hostname,
            path,
            port,
            services: Vec::new(),
            service_ports: BTreeMap::new(),
            exposed_ports: Vec::new(),
            docker_compose: false,
            environment_vars: BTreeMap::new(),
            registered_at: now,
            last_started: None,
            last_updated: now,
            last_status_change: None,
            status: ProjectStatus::Stopped,
        };
        project.recompute_exposed_ports();
        project
    }

    /// Recompute `exposed_ports` as the sorted, deduplicated union of the
    /// primary port and all service ports.
    pub fn recompute_exposed_ports(&mut self) {
        let mut ports: Vec<u16> = std::iter::once(self.port)
            .chain(self.service_ports.values().copied())
            .collect();
        ports.sort_unstable();
        ports.dedup();
        self.exposed_ports = ports;
    }

    /// Resolve which service publishes `port`, falling back to `"http"`
    /// for the primary port.
    pub fn service_for_port(&self, port: u16) -> String {
        self.service_ports
            .iter()
            .find(|(_, p)| **p == port)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| "http".to_string())
    }
}

/// Partial update applied through the registry's mutation primitive.
///
/// Deliberately has no `hostname`, `registered_at`, or `port` field:
/// those are immutable after registration.
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    pub services: Option<Vec<String>>,
    pub service_ports: Option<BTreeMap<String, u16>>,
    pub docker_compose: Option<bool>,
    pub environment_vars: Option<BTreeMap<String, String>>,
    pub status: Option<ProjectStatus>,
    pub last_started: Option<DateTime<Utc>>,
}

/// A single port collision between two running projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// The colliding port
    pub port: u16,

    /// Hostname of the other project declaring the port
    pub hostname: String,

    /// Service on the other project that publishes the port
    /// ("http" when it is the primary port)
    pub service: String,
}

/// Delta between a project's stored metadata and its live on-disk
/// configuration. Pure data; applying it is a separate, explicit step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectDiff {
    pub services_added: Vec<String>,
    pub services_removed: Vec<String>,
    /// Services newly publishing a host port
    pub ports_added: BTreeMap<String, u16>,
    /// Services that no longer publish a host port
    pub ports_removed: Vec<String>,
    /// Services present in both with a different port
    pub ports_changed: BTreeMap<String, u16>,
    /// Compose file appeared or disappeared since last scan
    pub compose_status_changed: bool,
}

impl ProjectDiff {
    /// True when the rescan found nothing different.
    pub fn is_empty(&self) -> bool {
        self.services_added.is_empty()
            && self.services_removed.is_empty()
            && self.ports_added.is_empty()
            && self.ports_removed.is_empty()
            && self.ports_changed.is_empty()
            && !self.compose_status_changed
    }
}
