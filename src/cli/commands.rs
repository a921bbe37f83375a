//! `run` and `schedule` command implementations

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use super::CliError;
use crate::config::{load_config, AppConfig};
use crate::export::run_export;
use crate::health::ServiceState;
use crate::scheduler::run_scheduled;
use crate::shutdown::SharedShutdown;

/// Personio HR data exporter
#[derive(Debug, Parser)]
#[command(name = "personio-export", version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config.yml", global = true)]
    pub config: PathBuf,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a single export and exit
    Run(RunArgs),

    /// Run exports on a fixed interval, with an optional health endpoint
    Schedule(ScheduleArgs),
}

/// Arguments for the `run` command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Override the configured output directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip document downloads for this run
    #[arg(long)]
    pub skip_documents: bool,
}

impl RunArgs {
    /// Execute a one-shot export run.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let mut config = load_config(&cli.config)?;
        self.apply(&mut config);

        let summary = run_export(&config).await?;
        info!(
            employees = summary.employees,
            skipped = summary.skipped_records,
            departments = summary.departments,
            documents = summary.documents.succeeded,
            "export finished"
        );
        if !summary.documents.is_clean() {
            warn!(
                failed = summary.documents.failed.len(),
                "some documents could not be downloaded"
            );
        }
        Ok(())
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(output) = &self.output {
            config.export.output_path = output.clone();
        }
        if self.skip_documents {
            config.export.include_documents = false;
        }
    }
}

/// Arguments for the `schedule` command
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Override the configured interval between runs (minutes)
    #[arg(long)]
    pub interval_minutes: Option<u64>,
}

impl ScheduleArgs {
    /// Run the schedule loop (and the health endpoint, when enabled) until
    /// shutdown is requested.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let mut config = load_config(&cli.config)?;
        if let Some(interval) = self.interval_minutes {
            config.schedule.interval_minutes = interval.max(1);
        }

        let state = ServiceState::new();

        let health_task = if config.health.enabled {
            let state = state.clone();
            let port = config.health.port;
            let shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                crate::health::serve(state, port, shutdown).await
            }))
        } else {
            None
        };

        run_scheduled(&config, state, shutdown).await;

        if let Some(task) = health_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(CliError::Health(e)),
                Err(e) => return Err(CliError::Health(format!("health task panicked: {e}"))),
            }
        }
        Ok(())
    }
}
