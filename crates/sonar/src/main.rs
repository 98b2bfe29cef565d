//! Sonar - run CloudWatch Logs Insights queries from the terminal.

mod app;
mod cli;

use anyhow::{Context, Result};
use app::SonarApp;
use clap::Parser;
use cli::Cli;
use sonar_core::config::SonarConfig;
use sonar_core::logging::{init_logging, log_dir, LogConfig};
use sonar_core::services::storage::default_data_dir;
use sonar_core::SonarState;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // The config may carry a log filter, so peek at it before logging starts
    let config_filter = SonarConfig::load(cli.config.as_deref(), &default_data_dir())
        .ok()
        .and_then(|config| config.log_filter);
    let mut log_config = LogConfig::new(log_dir());
    if let Some(filter) = cli.log_filter.clone().or(config_filter) {
        log_config = log_config.with_filter(filter);
    }
    let logging_guard = init_logging(log_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_target = ?logging_guard.target(),
        "Starting Sonar"
    );

    let code = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli));

    drop(logging_guard);
    code
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    let state = SonarState::new(cli.config.as_deref()).context("Failed to initialize Sonar")?;
    let app = SonarApp::new(Arc::new(state), cli.profile.as_deref(), cli.region.as_deref()).await;

    let code = app.execute(cli.command).await;
    if let Err(e) = &code {
        tracing::error!(error = %e, "Command failed");
    }
    code
}
