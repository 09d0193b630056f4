//! CLI command implementations.
//!
//! Orchestration glue only: every command opens the registry, builds the
//! lifecycle façade, performs one operation, and prints the result.
//! Nothing here touches the registry document directly.

use anyhow::{Context, Result};
use berth_core::{
    Config, Lifecycle, PortAllocator, PortRange, ProjectDiff, ProjectStatus, RegistryStore,
};
use std::io::Write;
use std::path::Path;

use crate::probe::PidFileProbe;

struct Session {
    store: RegistryStore,
    range: PortRange,
    probe: PidFileProbe,
}

impl Session {
    fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let data_dir = config.data_dir();
        let store = RegistryStore::open(&data_dir)?;
        let range = PortRange::from(&config);
        let probe = PidFileProbe::new(data_dir);
        Ok(Self { store, range, probe })
    }

    fn lifecycle(&self) -> Lifecycle<'_> {
        Lifecycle::new(&self.store, self.range, &self.probe)
    }
}

pub fn register(hostname: &str, path: &str) -> Result<()> {
    let session = Session::open()?;
    let project = session
        .lifecycle()
        .register(hostname, Path::new(path))
        .with_context(|| format!("Failed to register '{}'", hostname))?;

    println!("Registered '{}'", project.hostname);
    println!("  Port:     {}", project.port);
    println!("  Path:     {}", project.path.display());
    if project.docker_compose {
        println!("  Services: {}", project.services.join(", "));
    }
    println!("  URL:      http://{}.test (after DNS setup)", project.hostname);
    Ok(())
}

pub fn list() -> Result<()> {
    let session = Session::open()?;
    let mut projects = session.store.list()?;
    if projects.is_empty() {
        println!("No projects registered yet");
        return Ok(());
    }
    projects.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    println!("{:<24} {:<10} {:<7} PATH", "HOSTNAME", "STATUS", "PORT");
    for project in projects {
        println!(
            "{:<24} {:<10} {:<7} {}",
            project.hostname,
            project.status,
            project.port,
            project.path.display()
        );
    }
    Ok(())
}

pub fn status() -> Result<()> {
    let session = Session::open()?;
    let mut projects = session.lifecycle().refresh_statuses()?;
    if projects.is_empty() {
        println!("No projects registered yet");
        return Ok(());
    }
    projects.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    println!("{:<24} STATUS", "HOSTNAME");
    for project in projects {
        println!("{:<24} {}", project.hostname, project.status);
    }
    Ok(())
}

pub fn show(hostname: &str) -> Result<()> {
    let session = Session::open()?;
    let project = session.store.get(hostname)?;
    println!("{}", serde_json::to_string_pretty(&project)?);
    Ok(())
}

pub fn update(hostname: &str, apply: bool) -> Result<()> {
    let session = Session::open()?;
    let lifecycle = session.lifecycle();

    let diff = if apply {
        lifecycle.apply_rescan(hostname)?
    } else {
        lifecycle.rescan(hostname)?
    };

    if diff.is_empty() {
        println!("'{}' is up to date", hostname);
        return Ok(());
    }

    print_diff(&diff);
    if apply {
        println!("Changes applied");
    } else {
        println!("Run with --apply to record these changes");
    }
    Ok(())
}

pub fn unregister(hostname: &str, yes: bool) -> Result<()> {
    let session = Session::open()?;
    let project = session.store.get(hostname)?;

    if project.status == ProjectStatus::Running {
        println!("Warning: '{}' is currently running", hostname);
    }

    if !yes && !confirm(&format!("Unregister '{}'?", hostname))? {
        println!("Cancelled");
        return Ok(());
    }

    session.lifecycle().unregister(hostname)?;
    println!("Unregistered '{}'", hostname);
    Ok(())
}

pub fn ports() -> Result<()> {
    let session = Session::open()?;
    let allocator = PortAllocator::new(&session.store, session.range);
    let usage = allocator.port_usage()?;
    if usage.is_empty() {
        println!("No ports in use");
        return Ok(());
    }

    println!("{:<7} PROJECTS", "PORT");
    for (port, hostnames) in usage {
        println!("{:<7} {}", port, hostnames.join(", "));
    }
    Ok(())
}

pub fn env_set(hostname: &str, key: &str, value: &str) -> Result<()> {
    let session = Session::open()?;
    session.lifecycle().set_env(hostname, key, value)?;
    println!("Set {} for '{}'", key, hostname);
    Ok(())
}

pub fn env_unset(hostname: &str, key: &str) -> Result<()> {
    let session = Session::open()?;
    session.lifecycle().unset_env(hostname, key)?;
    println!("Unset {} for '{}'", key, hostname);
    Ok(())
}

fn print_diff(diff: &ProjectDiff) {
    if diff.compose_status_changed {
        println!("  compose file presence changed");
    }
    for service in &diff.services_added {
        println!("  + service {}", service);
    }
    for service in &diff.services_removed {
        println!("  - service {}", service);
    }
    for (service, port) in &diff.ports_added {
        println!("  + port {} ({})", port, service);
    }
    for service in &diff.ports_removed {
        println!("  - port ({})", service);
    }
    for (service, port) in &diff.ports_changed {
        println!("  ~ port {} ({})", port, service);
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
