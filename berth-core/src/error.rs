//! Error types for berth.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use crate::types::Conflict;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for berth operations.
pub type Result<T> = std::result::Result<T, BerthError>;

/// Main error type for berth.
#[derive(Error, Debug)]
pub enum BerthError {
    // Registry errors
    #[error("Project already registered: {hostname}")]
    DuplicateHostname { hostname: String },

    #[error("Project not found: {hostname}")]
    ProjectNotFound { hostname: String },

    #[error("Registry document is corrupt: {path:?}")]
    RegistryCorruption { path: PathBuf },

    // Project path errors
    #[error("Project path does not exist: {path:?}")]
    PathNotFound { path: PathBuf },

    // Compose errors
    #[error("Compose parse error: {reason}")]
    ComposeParse { reason: String },

    // Port errors
    #[error("No available ports in range {start}-{end}")]
    NoPortsAvailable { start: u16, end: u16 },

    #[error("Port {port} is outside the allowed range ({start}-{end})")]
    InvalidPort { port: u16, start: u16, end: u16 },

    #[error("Port conflict(s) detected: {}", format_conflicts(.conflicts))]
    PortConflict { conflicts: Vec<Conflict> },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // File system errors
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("port {} used by '{}' ({})", c.port, c.hostname, c.service))
        .collect::<Vec<_>>()
        .join(", ")
}
