use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use depwatch::checker::types::{ACCESS_METHOD_GITHUB, Auth};
use depwatch::config::{MonitorConfig, load_manifest, log_path};
use depwatch::logging::init_logging;
use depwatch::monitor::Monitor;
use depwatch::monitor::scheduler::schedule_summary;

#[derive(Parser)]
#[command(name = "depwatch")]
#[command(
    version,
    about = "Change monitoring for documentation sites, API specs and reference repositories"
)]
struct Cli {
    /// Log level used when DEPWATCH_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write JSON logs to a file (the data directory log when no path is given)
    #[arg(long, global = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check dependencies and print the results as JSON
    Check {
        /// Dependency manifest (.json, .yaml or .yml)
        #[arg(long)]
        manifest: PathBuf,

        /// Monitor configuration (.json, .yaml or .yml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only check dependencies that are due
        #[arg(long)]
        due: bool,
    },
    /// Print the check schedule summary as JSON
    Schedule {
        /// Dependency manifest (.json, .yaml or .yml)
        #[arg(long)]
        manifest: PathBuf,

        /// Monitor configuration (.json, .yaml or .yml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(MonitorConfig::default()),
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Check {
            manifest,
            config,
            due,
        } => {
            let dependencies = load_manifest(&manifest)
                .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
            let config = load_config(config.as_deref())?;

            let mut monitor = Monitor::with_default_registry(config)?;
            if let Some(token) = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()) {
                monitor = monitor.with_auth(ACCESS_METHOD_GITHUB, Auth::token(token));
            }

            let results = if due {
                monitor.check_due(&dependencies, Utc::now()).await
            } else {
                monitor.check_all(&dependencies).await
            };

            let changed = results.iter().filter(|r| r.has_changed).count();
            let failed = results.iter().filter(|r| r.error().is_some()).count();
            info!(
                "Checked {} dependencies: {} changed, {} failed",
                results.len(),
                changed,
                failed
            );

            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Schedule { manifest, config } => {
            let dependencies = load_manifest(&manifest)
                .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
            let config = load_config(config.as_deref())?;

            let summary = schedule_summary(&dependencies, &config, Utc::now());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.map(|path| path.unwrap_or_else(log_path));
    let _guard =
        init_logging(&cli.log_level, log_file.as_deref()).context("Failed to open log file")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command))
}
