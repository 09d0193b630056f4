//! Durable project registry.
//!
//! All projects live in a single JSON document. Every mutation runs under
//! an advisory exclusive file lock and lands via write-to-temp-file plus
//! atomic rename, so a crash mid-write leaves the prior valid document
//! intact and concurrent command invocations never interleave half-written
//! state.

use crate::error::{BerthError, Result};
use crate::paths;
use crate::types::{MetadataUpdate, Project, ProjectStatus};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// The registry document: hostname to project record.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    projects: BTreeMap<String, Project>,
}

/// Guard holding the exclusive registry lock; released on drop.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            warn!("Failed to release registry lock: {}", e);
        }
    }
}

/// Durable CRUD over the project set.
///
/// Each command invocation constructs a store, performs its operation,
/// and drops it; nothing is cached across invocations. The document on
/// disk is the single source of truth.
pub struct RegistryStore {
    data_dir: PathBuf,
}

impl RegistryStore {
    /// Open (and initialize) a registry rooted at `data_dir`.
    #[instrument]
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| BerthError::Io { path: data_dir.to_path_buf(), source: e })?;
        let projects_dir = paths::projects_dir(data_dir);
        std::fs::create_dir_all(&projects_dir)
            .map_err(|e| BerthError::Io { path: projects_dir, source: e })?;

        Ok(Self { data_dir: data_dir.to_path_buf() })
    }

    /// The data directory this store is rooted at.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ========================
    // Queries (lockless reads)
    // ========================

    /// Get a project by hostname.
    pub fn get(&self, hostname: &str) -> Result<Project> {
        let data = self.load()?;
        data.projects
            .get(hostname)
            .cloned()
            .ok_or_else(|| BerthError::ProjectNotFound { hostname: hostname.to_string() })
    }

    /// List all registered projects.
    pub fn list(&self) -> Result<Vec<Project>> {
        let data = self.load()?;
        Ok(data.projects.into_values().collect())
    }

    /// List projects whose last-observed status is `running`.
    pub fn running_projects(&self) -> Result<Vec<Project>> {
        let data = self.load()?;
        Ok(data
            .projects
            .into_values()
            .filter(|p| p.status == ProjectStatus::Running)
            .collect())
    }

    // ========================
    // Mutations (locked read-modify-write)
    // ========================

    /// Register a new project.
    ///
    /// # Errors
    ///
    /// `DuplicateHostname` if the hostname already exists.
    #[instrument(skip(self, project), fields(hostname = %project.hostname))]
    pub fn register(&self, project: Project) -> Result<Project> {
        let hostname = project.hostname.clone();
        let _lock = self.lock()?;

        let mut data = self.load()?;
        if data.projects.contains_key(&hostname) {
            return Err(BerthError::DuplicateHostname { hostname });
        }
        data.projects.insert(hostname.clone(), project.clone());
        self.save(&data)?;

        let project_dir = paths::project_dir(&self.data_dir, &hostname);
        std::fs::create_dir_all(&project_dir)
            .map_err(|e| BerthError::Io { path: project_dir, source: e })?;

        info!("Registered project '{}'", hostname);
        Ok(project)
    }

    /// Remove a project and its auxiliary state directory.
    #[instrument(skip(self))]
    pub fn unregister(&self, hostname: &str) -> Result<()> {
        let _lock = self.lock()?;

        let mut data = self.load()?;
        if data.projects.remove(hostname).is_none() {
            return Err(BerthError::ProjectNotFound { hostname: hostname.to_string() });
        }
        self.save(&data)?;

        let project_dir = paths::project_dir(&self.data_dir, hostname);
        if project_dir.is_dir() {
            if let Err(e) = std::fs::remove_dir_all(&project_dir) {
                warn!("Failed to remove project dir {:?}: {}", project_dir, e);
            }
        }

        info!("Unregistered project '{}'", hostname);
        Ok(())
    }

    /// Update a project's lifecycle status.
    pub fn update_status(&self, hostname: &str, status: ProjectStatus) -> Result<Project> {
        self.update_metadata(
            hostname,
            MetadataUpdate { status: Some(status), ..Default::default() },
        )
    }

    /// Apply a partial metadata update; the mutation primitive the
    /// reconciler and lifecycle use.
    ///
    /// Always stamps `last_updated`; a status transition additionally
    /// stamps `last_status_change`. `exposed_ports` is recomputed
    /// whenever `service_ports` changes. `hostname`, `registered_at`,
    /// and `port` are untouchable by construction.
    #[instrument(skip(self, update))]
    pub fn update_metadata(&self, hostname: &str, update: MetadataUpdate) -> Result<Project> {
        let _lock = self.lock()?;

        let mut data = self.load()?;
        let project = data
            .projects
            .get_mut(hostname)
            .ok_or_else(|| BerthError::ProjectNotFound { hostname: hostname.to_string() })?;

        let now = Utc::now();

        if let Some(services) = update.services {
            project.services = services;
        }
        if let Some(service_ports) = update.service_ports {
            project.service_ports = service_ports;
            project.recompute_exposed_ports();
        }
        if let Some(docker_compose) = update.docker_compose {
            project.docker_compose = docker_compose;
        }
        if let Some(environment_vars) = update.environment_vars {
            project.environment_vars = environment_vars;
        }
        if let Some(last_started) = update.last_started {
            project.last_started = Some(last_started);
        }
        if let Some(status) = update.status {
            if status != project.status {
                project.last_status_change = Some(now);
            }
            project.status = status;
        }
        project.last_updated = now;

        let updated = project.clone();
        self.save(&data)?;

        debug!("Updated metadata for '{}'", hostname);
        Ok(updated)
    }

    // ========================
    // Document I/O
    // ========================

    /// Load the registry document.
    ///
    /// A missing or empty file is an empty registry. A parse failure on an
    /// existing file is retried once to tolerate a writer caught mid-rename,
    /// then surfaces `RegistryCorruption` with the offending path; there is
    /// no silent recovery.
    fn load(&self) -> Result<RegistryData> {
        let path = paths::registry_path(&self.data_dir);
        match Self::read_document(&path)? {
            Some(data) => Ok(data),
            None => {
                // Narrow window: the file may have been caught mid-rename.
                std::thread::sleep(Duration::from_millis(20));
                match Self::read_document(&path)? {
                    Some(data) => Ok(data),
                    None => Err(BerthError::RegistryCorruption { path }),
                }
            }
        }
    }

    /// One read attempt. `Ok(None)` means the file exists but failed to
    /// parse; missing and empty files parse as the empty registry.
    fn read_document(path: &Path) -> Result<Option<RegistryData>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Some(RegistryData::default()));
            }
            Err(e) => return Err(BerthError::Io { path: path.to_path_buf(), source: e }),
        };

        if content.trim().is_empty() {
            return Ok(Some(RegistryData::default()));
        }

        match serde_json::from_str(&content) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                warn!("Registry document {:?} failed to parse: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Atomically persist the registry document: temp file in the same
    /// directory, write, flush to disk, rename over the canonical path.
    fn save(&self, data: &RegistryData) -> Result<()> {
        let path = paths::registry_path(&self.data_dir);
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| BerthError::Other(anyhow::anyhow!("Failed to serialize registry: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.data_dir)
            .map_err(|e| BerthError::Io { path: self.data_dir.clone(), source: e })?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.flush())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| BerthError::Io { path: tmp.path().to_path_buf(), source: e })?;

        tmp.persist(&path)
            .map_err(|e| BerthError::Io { path: path.clone(), source: e.error })?;
        Ok(())
    }

    /// Acquire the exclusive advisory lock around a read-modify-write
    /// cycle. Blocks until the current holder releases it.
    fn lock(&self) -> Result<LockGuard> {
        let lock_path = paths::lock_path(&self.data_dir);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| BerthError::Io { path: lock_path.clone(), source: e })?;

        file.lock_exclusive().map_err(|e| BerthError::Io { path: lock_path, source: e })?;
        Ok(LockGuard { file })
    }
}
