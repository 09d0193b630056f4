//! Compose-file scanning and host-port extraction.

use super::types::PortSpec;
use crate::error::{BerthError, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Result of scanning a project directory for compose metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeScan {
    /// Service names in compose-file order
    pub services: Vec<String>,

    /// Host port published by each service
    pub service_ports: BTreeMap<String, u16>,

    /// Whether a compose file was found
    pub compose_present: bool,
}

/// Find the compose file in a project directory.
///
/// Probes `docker-compose.yml` then `docker-compose.yaml`.
pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
    for filename in ["docker-compose.yml", "docker-compose.yaml"] {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Extract the host port each service publishes.
///
/// Short and long syntax may mix across services. A service's first
/// mapping in file order wins; later mappings are ignored. A malformed
/// `ports` entry contributes nothing and does not abort extraction for
/// other services.
///
/// # Errors
///
/// Returns `ComposeParse` only when the document itself is invalid or
/// `services` is present but not a mapping.
#[instrument(skip(content))]
pub fn extract_ports(content: &str) -> Result<BTreeMap<String, u16>> {
    let mut ports = BTreeMap::new();
    for (name, service) in services_of(content)? {
        if let Some(port) = first_host_port(&service) {
            ports.insert(name, port);
        }
    }
    Ok(ports)
}

/// Extract service names in compose-file order.
///
/// # Errors
///
/// Same failure contract as [`extract_ports`].
#[instrument(skip(content))]
pub fn detect_services(content: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for (name, _) in services_of(content)? {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Scan a project directory for compose metadata.
///
/// An absent compose file yields an empty scan with
/// `compose_present = false`. An unreadable or unparseable file degrades
/// to the same empty scan: a broken compose file is treated like a
/// missing one, never a hard failure for the project as a whole.
#[instrument]
pub fn scan_dir(dir: &Path) -> ComposeScan {
    let Some(compose_file) = find_compose_file(dir) else {
        return ComposeScan::default();
    };

    let content = match std::fs::read_to_string(&compose_file) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {:?}: {}", compose_file, e);
            return ComposeScan::default();
        }
    };

    match (detect_services(&content), extract_ports(&content)) {
        (Ok(services), Ok(service_ports)) => {
            debug!(
                services = services.len(),
                published = service_ports.len(),
                "Scanned compose file {:?}",
                compose_file
            );
            ComposeScan { services, service_ports, compose_present: true }
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!("Ignoring malformed compose file {:?}: {}", compose_file, e);
            ComposeScan::default()
        }
    }
}

/// Parse the document and yield `(service_name, service_value)` pairs in
/// file order. serde_yaml mappings preserve YAML insertion order.
fn services_of(content: &str) -> Result<Vec<(String, Value)>> {
    let doc: Value = serde_yaml::from_str(content)
        .map_err(|e| BerthError::ComposeParse { reason: e.to_string() })?;

    let Value::Mapping(root) = doc else {
        return Err(BerthError::ComposeParse {
            reason: "Top-level structure is not a mapping".to_string(),
        });
    };

    let services = match root.get("services") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(services)) => services,
        Some(_) => {
            return Err(BerthError::ComposeParse {
                reason: "'services' is not a mapping".to_string(),
            });
        }
    };

    Ok(services
        .iter()
        .filter_map(|(key, value)| key.as_str().map(|name| (name.to_string(), value.clone())))
        .collect())
}

/// Resolve the first host-published port a service declares, in entry
/// order. Entries that fail to deserialize are skipped.
fn first_host_port(service: &Value) -> Option<u16> {
    let ports = service.as_mapping()?.get("ports")?.as_sequence()?;

    for entry in ports {
        match serde_yaml::from_value::<PortSpec>(entry.clone()) {
            Ok(spec) => {
                if let Some(port) = spec.host_port() {
                    return Some(port);
                }
            }
            Err(e) => {
                debug!("Skipping malformed ports entry: {}", e);
            }
        }
    }

    None
}
