use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "routeprobe")]
#[command(about = "Discover, probe and repair tests for HTTP APIs")]
#[command(version)]
struct Cli {
    /// Path to the project (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (defaults to .routeprobe/config.toml in the project)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline against a live base URL
    Run {
        /// Base URL of the running service
        #[arg(long)]
        base_url: String,

        /// Interface document (URL or file); takes precedence over the source scan
        #[arg(long)]
        spec: Option<String>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the security payload stage
        #[arg(long)]
        skip_security: bool,

        /// Skip the load burst stage
        #[arg(long)]
        skip_performance: bool,

        /// Use templates only, never ask the backend for rewrites
        #[arg(long)]
        no_generate: bool,
    },

    /// Discover routes and the auth profile without probing
    Scan {
        /// Interface document (URL or file) instead of the source tree
        #[arg(long)]
        spec: Option<String>,
    },

    /// Initialize a new .routeprobe/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            base_url,
            spec,
            output,
            skip_security,
            skip_performance,
            no_generate,
        } => {
            let settings = cli::run::CliSettings {
                base_url,
                spec,
                output,
                skip_security,
                skip_performance,
                no_generate,
            };
            cli::run::run_command(cli.path, cli.config, settings).await?;
        }
        Commands::Scan { spec } => {
            cli::scan::scan_command(cli.path, cli.config, spec).await?;
        }
        Commands::Init { force } => {
            let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));
            cli::init::init_command(&work_dir, force).await?;
        }
    }

    Ok(())
}
