use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod probe;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Local development project and port manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a project
    Register {
        /// Hostname for the project (e.g. "my-app")
        #[arg(short = 'H', long)]
        hostname: String,

        /// Path to the project directory
        #[arg(short, long, default_value = ".")]
        path: String,
    },

    /// List all registered projects
    List,

    /// Show live status of all projects
    Status,

    /// Show a project's full record
    Show {
        /// Project hostname
        hostname: String,
    },

    /// Rescan a project's compose file and report (or apply) changes
    Update {
        /// Project hostname
        hostname: String,

        /// Apply the detected changes instead of only reporting them
        #[arg(long)]
        apply: bool,
    },

    /// Unregister a project
    Unregister {
        /// Project hostname
        hostname: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Report which projects declare which ports
    Ports,

    /// Manage project-scoped environment variables
    #[command(subcommand)]
    Env(EnvCommands),
}

#[derive(Subcommand)]
enum EnvCommands {
    /// Set a variable (KEY=VALUE)
    Set {
        /// Project hostname
        hostname: String,

        /// Variable as KEY=VALUE
        var: String,
    },

    /// Remove a variable
    Unset {
        /// Project hostname
        hostname: String,

        /// Variable name
        key: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Register { hostname, path } => commands::register(&hostname, &path),
        Commands::List => commands::list(),
        Commands::Status => commands::status(),
        Commands::Show { hostname } => commands::show(&hostname),
        Commands::Update { hostname, apply } => commands::update(&hostname, apply),
        Commands::Unregister { hostname, yes } => commands::unregister(&hostname, yes),
        Commands::Ports => commands::ports(),
        Commands::Env(env_cmd) => match env_cmd {
            EnvCommands::Set { hostname, var } => {
                let (key, value) = var.split_once('=').ok_or_else(|| {
                    anyhow::anyhow!("Invalid variable format (expected KEY=VALUE): {}", var)
                })?;
                commands::env_set(&hostname, key, value)
            }
            EnvCommands::Unset { hostname, key } => commands::env_unset(&hostname, &key),
        },
    }
}
