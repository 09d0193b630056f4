//! Lifecycle façade: the single entry point for CLI and other consumers.
//!
//! Composes the registry store, port allocator, compose extractor, and
//! reconciler into register / update / start-validate / unregister flows.
//! It never starts or stops processes itself; live process truth comes
//! from the injected [`ProcessProbe`] collaborator.

use crate::allocator::{PortAllocator, PortRange};
use crate::compose;
use crate::error::{BerthError, Result};
use crate::reconcile;
use crate::registry::RegistryStore;
use crate::types::{MetadataUpdate, Project, ProjectDiff, ProjectStatus};
use chrono::Utc;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Live process truth supplied by the external process collaborator.
pub trait ProcessProbe {
    /// Whether the project's services are actually running right now.
    fn is_running(&self, hostname: &str) -> bool;
}

/// Probe that answers from a fixed set; for tests and for consumers that
/// resolve liveness out of band.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    running: Vec<String>,
}

impl StaticProbe {
    pub fn new(running: Vec<String>) -> Self {
        Self { running }
    }
}

impl ProcessProbe for StaticProbe {
    fn is_running(&self, hostname: &str) -> bool {
        self.running.iter().any(|h| h == hostname)
    }
}

/// The lifecycle façade.
pub struct Lifecycle<'a> {
    store: &'a RegistryStore,
    range: PortRange,
    probe: &'a dyn ProcessProbe,
}

impl<'a> Lifecycle<'a> {
    pub fn new(store: &'a RegistryStore, range: PortRange, probe: &'a dyn ProcessProbe) -> Self {
        Self { store, range, probe }
    }

    /// Register a new project: scan its compose file, allocate a primary
    /// port, derive the exposed set, persist.
    ///
    /// # Errors
    ///
    /// `PathNotFound` if the path does not exist, `DuplicateHostname` if
    /// the hostname is taken, `NoPortsAvailable` if the range is full.
    #[instrument(skip(self, path))]
    pub fn register(&self, hostname: &str, path: &Path) -> Result<Project> {
        if !path.is_dir() {
            return Err(BerthError::PathNotFound { path: path.to_path_buf() });
        }
        let path = path
            .canonicalize()
            .map_err(|e| BerthError::Io { path: path.to_path_buf(), source: e })?;

        let scan = compose::scan_dir(&path);
        let allocator = PortAllocator::new(self.store, self.range);
        let port = allocator.allocate()?;

        let mut project = Project::new(hostname.to_string(), path, port);
        project.services = scan.services;
        project.service_ports = scan.service_ports;
        project.docker_compose = scan.compose_present;
        project.recompute_exposed_ports();

        let project = self.store.register(project)?;
        info!("Registered '{}' on port {}", hostname, port);
        Ok(project)
    }

    /// Remove a project from the registry.
    #[instrument(skip(self))]
    pub fn unregister(&self, hostname: &str) -> Result<()> {
        self.store.unregister(hostname)
    }

    /// Preview what changed on disk since the stored record. Read-only.
    pub fn rescan(&self, hostname: &str) -> Result<ProjectDiff> {
        let project = self.store.get(hostname)?;
        reconcile::rescan(&project)
    }

    /// Rescan and, when the diff is non-empty, apply it.
    ///
    /// The apply is gated by a fresh conflict check against the *new*
    /// candidate exposed set, excluding this project; conflicts abort
    /// before any mutation.
    #[instrument(skip(self))]
    pub fn apply_rescan(&self, hostname: &str) -> Result<ProjectDiff> {
        let project = self.store.get(hostname)?;
        if !project.path.is_dir() {
            return Err(BerthError::PathNotFound { path: project.path.clone() });
        }

        let scan = compose::scan_dir(&project.path);
        let diff = reconcile::diff(&project, &scan);
        if diff.is_empty() {
            return Ok(diff);
        }

        let candidate = reconcile::candidate_exposed_ports(&project, &scan);
        let allocator = PortAllocator::new(self.store, self.range);
        let conflicts = allocator.check_conflicts(&candidate, hostname)?;
        if !conflicts.is_empty() {
            return Err(BerthError::PortConflict { conflicts });
        }

        self.store.update_metadata(
            hostname,
            MetadataUpdate {
                services: Some(scan.services),
                service_ports: Some(scan.service_ports),
                docker_compose: Some(scan.compose_present),
                ..Default::default()
            },
        )?;

        info!("Applied rescan for '{}'", hostname);
        Ok(diff)
    }

    /// Refresh every project's `status` from the process probe.
    ///
    /// Stored status is last-observed truth only; conflict decisions must
    /// not trust it until this has run.
    #[instrument(skip(self))]
    pub fn refresh_statuses(&self) -> Result<Vec<Project>> {
        let mut refreshed = Vec::new();
        for project in self.store.list()? {
            let live = if self.probe.is_running(&project.hostname) {
                ProjectStatus::Running
            } else {
                ProjectStatus::Stopped
            };

            // Error state is sticky until the probe sees the project alive
            if project.status == ProjectStatus::Error && live == ProjectStatus::Stopped {
                refreshed.push(project);
                continue;
            }

            if live != project.status {
                refreshed.push(self.store.update_status(&project.hostname, live)?);
            } else {
                refreshed.push(project);
            }
        }
        Ok(refreshed)
    }

    /// Validate that a project may start, then record the start.
    ///
    /// Refreshes all statuses from the probe first, so conflicts are
    /// computed against live truth rather than stale records.
    ///
    /// # Errors
    ///
    /// `PortConflict` with the complete conflict list if any exposed port
    /// collides with another running project.
    #[instrument(skip(self))]
    pub fn validate_start(&self, hostname: &str) -> Result<Project> {
        self.refresh_statuses()?;

        let allocator = PortAllocator::new(self.store, self.range);
        allocator.validate_startup(hostname)?;

        self.store.update_metadata(
            hostname,
            MetadataUpdate {
                status: Some(ProjectStatus::Running),
                last_started: Some(Utc::now()),
                ..Default::default()
            },
        )
    }

    /// Record that the external collaborator stopped the project.
    pub fn mark_stopped(&self, hostname: &str) -> Result<Project> {
        self.store.update_status(hostname, ProjectStatus::Stopped)
    }

    /// Record that the external collaborator observed a failure.
    pub fn mark_error(&self, hostname: &str) -> Result<Project> {
        warn!("Project '{}' marked as errored", hostname);
        self.store.update_status(hostname, ProjectStatus::Error)
    }

    /// Set a project-scoped environment variable.
    pub fn set_env(&self, hostname: &str, key: &str, value: &str) -> Result<Project> {
        let project = self.store.get(hostname)?;
        let mut vars = project.environment_vars;
        vars.insert(key.to_string(), value.to_string());
        self.store.update_metadata(
            hostname,
            MetadataUpdate { environment_vars: Some(vars), ..Default::default() },
        )
    }

    /// Remove a project-scoped environment variable.
    pub fn unset_env(&self, hostname: &str, key: &str) -> Result<Project> {
        let project = self.store.get(hostname)?;
        let mut vars = project.environment_vars;
        vars.remove(key);
        self.store.update_metadata(
            hostname,
            MetadataUpdate { environment_vars: Some(vars), ..Default::default() },
        )
    }
}
