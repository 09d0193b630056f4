//! Reconciliation between stored project metadata and on-disk state.
//!
//! `rescan` is pure computation: it re-derives what the project's compose
//! file currently says and diffs it against what the registry remembers.
//! Applying the diff is a separate, explicit step owned by the lifecycle
//! façade.

use crate::compose::{self, ComposeScan};
use crate::error::{BerthError, Result};
use crate::types::{Project, ProjectDiff};
use tracing::{debug, instrument};

/// Re-derive a project's observable state and diff it against the stored
/// record. Mutates nothing.
///
/// # Errors
///
/// `PathNotFound` when the project directory no longer exists; a missing
/// path is a distinct condition from "no compose file".
#[instrument(skip(project), fields(hostname = %project.hostname))]
pub fn rescan(project: &Project) -> Result<ProjectDiff> {
    if !project.path.is_dir() {
        return Err(BerthError::PathNotFound { path: project.path.clone() });
    }

    let scan = compose::scan_dir(&project.path);
    let diff = diff(project, &scan);
    debug!(empty = diff.is_empty(), "Rescanned '{}'", project.hostname);
    Ok(diff)
}

/// Compute the delta between the stored record and a fresh scan.
pub fn diff(project: &Project, scan: &ComposeScan) -> ProjectDiff {
    let mut diff = ProjectDiff {
        compose_status_changed: scan.compose_present != project.docker_compose,
        ..Default::default()
    };

    diff.services_added = scan
        .services
        .iter()
        .filter(|s| !project.services.contains(s))
        .cloned()
        .collect();
    diff.services_removed = project
        .services
        .iter()
        .filter(|s| !scan.services.contains(s))
        .cloned()
        .collect();
    diff.services_added.sort();
    diff.services_removed.sort();

    for (service, port) in &scan.service_ports {
        match project.service_ports.get(service) {
            None => {
                diff.ports_added.insert(service.clone(), *port);
            }
            Some(previous) if previous != port => {
                diff.ports_changed.insert(service.clone(), *port);
            }
            Some(_) => {}
        }
    }
    diff.ports_removed = project
        .service_ports
        .keys()
        .filter(|s| !scan.service_ports.contains_key(*s))
        .cloned()
        .collect();

    diff
}

/// The candidate exposed set the project would have after applying a
/// fresh scan: primary port union the newly scanned service ports.
pub fn candidate_exposed_ports(project: &Project, scan: &ComposeScan) -> Vec<u16> {
    let mut ports: Vec<u16> = std::iter::once(project.port)
        .chain(scan.service_ports.values().copied())
        .collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}
