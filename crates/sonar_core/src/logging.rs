//! Tracing setup for the Sonar binary.
//!
//! Interactive runs log to stderr only. Piped or scripted runs write a daily
//! rolling file under `<data_dir>/logs` and echo warnings to stderr, so
//! stdout stays clean for query results. The filter comes from, in order:
//! an explicit filter, `SONAR_LOG`, `RUST_LOG`, then a build-type default.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "sonar";
const FILTER_ENV_VARS: [&str; 2] = ["SONAR_LOG", "RUST_LOG"];

/// Where log lines end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// stderr only.
    Console,
    /// Rolling file, warnings echoed to stderr.
    File,
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    /// stderr is attached to a terminal.
    pub is_tty: bool,
    /// Filter directive overriding the environment.
    pub log_filter: Option<String>,
}

impl LogConfig {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir, is_tty: atty::is(atty::Stream::Stderr), log_filter: None }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Target requested by this config, before any fallback.
    pub fn preferred_target(&self) -> LogTarget {
        if self.is_tty {
            LogTarget::Console
        } else {
            LogTarget::File
        }
    }
}

/// Keeps the file writer alive; hold it until the process exits.
pub struct LoggingGuard {
    target: LogTarget,
    _flush: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Target that was actually installed.
    pub fn target(&self) -> LogTarget {
        self.target
    }
}

/// Install the global subscriber. A file target that cannot be opened falls
/// back to the console.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let filter = config.log_filter.as_deref();

    if config.preferred_target() == LogTarget::File {
        match install_file_subscriber(&config) {
            Ok(flush) => return LoggingGuard { target: LogTarget::File, _flush: Some(flush) },
            Err(e) => eprintln!("Warning: file logging unavailable ({e}), logging to stderr"),
        }
    }

    install_console_subscriber(filter);
    LoggingGuard { target: LogTarget::Console, _flush: None }
}

fn install_console_subscriber(filter: Option<&str>) {
    // A subscriber may already be installed by a test harness
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(filter))
        .with_target(false)
        .try_init();
}

fn install_file_subscriber(
    config: &LogConfig,
) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&config.log_dir)?;
    let (file_writer, flush) = tracing_appender::non_blocking(appender);

    let writer = std::io::stderr.with_max_level(tracing::Level::WARN).and(file_writer);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(env_filter(config.log_filter.as_deref()))
        .with_ansi(false)
        .try_init()?;

    Ok(flush)
}

/// Resolve the filter. An unparsable explicit filter falls back to the
/// build default rather than the environment.
fn env_filter(explicit: Option<&str>) -> EnvFilter {
    if let Some(directives) = explicit {
        return EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    FILTER_ENV_VARS
        .iter()
        .find_map(|var| EnvFilter::try_from_env(var).ok())
        .unwrap_or_else(|| EnvFilter::new(default_log_filter()))
}

/// Build-type default filter. AWS SDK internals stay at `warn`.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,sonar=debug,sonar_core=trace,sonar_ui=debug,aws_config=warn,aws_smithy_runtime=warn,hyper=warn"
    } else {
        "warn,sonar=info,sonar_core=info,sonar_ui=info,aws_config=warn,aws_smithy_runtime=warn,hyper=warn"
    }
}

/// `<data_dir>/logs`.
pub fn log_dir() -> PathBuf {
    crate::services::storage::default_data_dir().join("logs")
}
