//! Centralized path configuration for berth.
//!
//! All data paths go through this module so the CLI and any future
//! consumers agree on where the registry lives.

use std::path::{Path, PathBuf};

/// Get the berth data directory.
///
/// Resolution order:
/// 1. `BERTH_DATA_DIR` environment variable
/// 2. `~/.berth`
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BERTH_DATA_DIR") {
        return PathBuf::from(dir);
    }

    dirs::home_dir().map(|h| h.join(".berth")).unwrap_or_else(|| PathBuf::from(".berth"))
}

/// Get the registry document path.
pub fn registry_path(data_dir: &Path) -> PathBuf {
    data_dir.join("projects.json")
}

/// Get the registry lock file path.
pub fn lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join("registry.lock")
}

/// Get the directory holding per-project auxiliary state.
pub fn projects_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("projects")
}

/// Get the auxiliary state directory for a specific project.
pub fn project_dir(data_dir: &Path, hostname: &str) -> PathBuf {
    projects_dir(data_dir).join(hostname)
}

/// Get the configuration file path.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_consistency() {
        let base = PathBuf::from("/tmp/berth-test");
        assert!(registry_path(&base).starts_with(&base));
        assert!(lock_path(&base).starts_with(&base));
        assert!(projects_dir(&base).starts_with(&base));
        assert!(config_path(&base).starts_with(&base));
        assert_eq!(project_dir(&base, "my-app"), base.join("projects").join("my-app"));
    }
}
