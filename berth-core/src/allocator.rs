//! Port allocation and conflict detection.
//!
//! Ports are claimed from a configured range (default 5000-5999). A port
//! counts as taken when any registered project declares it in
//! `exposed_ports` or when the OS reports it bound. Conflict checks only
//! consider *running* projects; a stopped project nominally sharing a
//! port is informational, never a conflict.

use crate::config::Config;
use crate::error::{BerthError, Result};
use crate::registry::RegistryStore;
use crate::types::Conflict;
use std::collections::{BTreeMap, BTreeSet};
use std::net::TcpListener;
use tracing::{debug, instrument};

/// Inclusive port allocation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// True when `port` falls inside the range.
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }
}

impl From<&Config> for PortRange {
    fn from(config: &Config) -> Self {
        Self { start: config.port_range_start, end: config.port_range_end }
    }
}

/// Allocates ports and detects collisions against the registry.
pub struct PortAllocator<'a> {
    store: &'a RegistryStore,
    range: PortRange,
}

impl<'a> PortAllocator<'a> {
    /// Create an allocator over the given registry and range.
    pub fn new(store: &'a RegistryStore, range: PortRange) -> Self {
        Self { store, range }
    }

    /// The configured allocation range.
    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Check whether a port is currently unbound at the OS level.
    ///
    /// A transient bind-and-release probe. A busy port means
    /// "unavailable", never an error; no retry.
    pub fn is_port_available(&self, port: u16) -> bool {
        TcpListener::bind(("127.0.0.1", port)).is_ok()
    }

    /// Allocate the first free port in the range, in ascending order.
    ///
    /// A port is free when no registered project (running or stopped)
    /// declares it in `exposed_ports` and the OS-level probe succeeds.
    ///
    /// # Errors
    ///
    /// `NoPortsAvailable` when the range is exhausted.
    #[instrument(skip(self))]
    pub fn allocate(&self) -> Result<u16> {
        let reserved: BTreeSet<u16> = self
            .store
            .list()?
            .iter()
            .flat_map(|p| p.exposed_ports.iter().copied())
            .collect();

        for port in self.range.start..=self.range.end {
            if !reserved.contains(&port) && self.is_port_available(port) {
                debug!("Allocated port {}", port);
                return Ok(port);
            }
        }

        Err(BerthError::NoPortsAvailable { start: self.range.start, end: self.range.end })
    }

    /// Intersect `candidate_ports` with every running project's exposed
    /// ports, excluding `exclude_hostname`.
    ///
    /// Every match yields a record; callers always see the complete set
    /// and decide for themselves whether it is fatal.
    #[instrument(skip(self, candidate_ports))]
    pub fn check_conflicts(
        &self,
        candidate_ports: &[u16],
        exclude_hostname: &str,
    ) -> Result<Vec<Conflict>> {
        let running = self.store.running_projects()?;
        let mut conflicts = Vec::new();

        for port in candidate_ports {
            for other in &running {
                if other.hostname == exclude_hostname {
                    continue;
                }
                if other.exposed_ports.contains(port) {
                    conflicts.push(Conflict {
                        port: *port,
                        hostname: other.hostname.clone(),
                        service: other.service_for_port(*port),
                    });
                }
            }
        }

        Ok(conflicts)
    }

    /// Validate that a project can start without colliding with any other
    /// running project.
    ///
    /// # Errors
    ///
    /// `PortConflict` carrying the full conflict list if any port is taken.
    #[instrument(skip(self))]
    pub fn validate_startup(&self, hostname: &str) -> Result<()> {
        let project = self.store.get(hostname)?;
        let conflicts = self.check_conflicts(&project.exposed_ports, hostname)?;
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(BerthError::PortConflict { conflicts })
        }
    }

    /// Diagnostic report: every declared port mapped to the hostnames
    /// declaring it, running or stopped.
    pub fn port_usage(&self) -> Result<BTreeMap<u16, Vec<String>>> {
        let mut usage: BTreeMap<u16, Vec<String>> = BTreeMap::new();
        for project in self.store.list()? {
            for port in &project.exposed_ports {
                usage.entry(*port).or_default().push(project.hostname.clone());
            }
        }
        Ok(usage)
    }
}
