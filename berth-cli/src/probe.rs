//! Process liveness probe backed by per-project pid files.
//!
//! The external process collaborator (whatever actually starts the
//! project) writes its pid to `<data_dir>/projects/<hostname>/pid`.
//! A project counts as running when that pid still answers signal 0.

use berth_core::{paths, ProcessProbe};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

pub struct PidFileProbe {
    data_dir: PathBuf,
}

impl PidFileProbe {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn pid_of(&self, hostname: &str) -> Option<u32> {
        let pid_path = paths::project_dir(&self.data_dir, hostname).join("pid");
        let content = std::fs::read_to_string(pid_path).ok()?;
        content.trim().parse().ok()
    }
}

impl ProcessProbe for PidFileProbe {
    fn is_running(&self, hostname: &str) -> bool {
        let Some(pid) = self.pid_of(hostname) else {
            debug!("No pid file for '{}'", hostname);
            return false;
        };
        // Signal 0 probes existence without delivering anything
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
