//! Sonar application: wires state, the logs client and the Logs Insights
//! controller, and runs one command against them.

use crate::cli::{Command, QueryArgs, SavedCommand, SourceArgs};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sonar_core::config::ResolvedProfile;
use sonar_core::models::POLL_INTERVAL_SECS;
use sonar_core::{LogsInsightsService, QueryOutcome, QueryRunStatus, SonarState, StatusKind, TimeRange};
use sonar_ui::query_editor::{completions, format_query};
use sonar_ui::{
    banner_text, DetailState, DrawerDock, DrawerId, LogInsightsController, Notifier, Toast,
    ToastSeverity,
};
use std::process::ExitCode;
use std::sync::Arc;

/// Prints toasts to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        eprintln!("{}: {}", toast.severity.label(), toast.message);
        if let Some(hint) = &toast.hint {
            eprintln!("  hint: {hint}");
        }
    }
}

/// Root application.
pub struct SonarApp {
    state: Arc<SonarState>,
    profile: ResolvedProfile,
    service: Arc<dyn LogsInsightsService>,
    controller: Arc<LogInsightsController>,
}

impl SonarApp {
    /// Connect to the resolved profile and build the controller.
    pub async fn new(state: Arc<SonarState>, profile: Option<&str>, region: Option<&str>) -> Self {
        let profile = state.resolve_profile(profile, region);
        let service = state.client(&profile).await;

        let controller = Arc::new(LogInsightsController::new(
            service.clone(),
            Arc::new(ConsoleNotifier),
            Arc::new(DrawerDock::new()),
            state.storage().clone(),
        ));

        tracing::info!(profile = %profile.name, region = %profile.region, "Sonar ready");

        Self { state, profile, service, controller }
    }

    pub async fn execute(&self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Query(args) => self.query(args).await,
            Command::Format(source) => {
                println!("{}", format_query(&read_source(&source)?.unwrap_or_default()));
                Ok(ExitCode::SUCCESS)
            }
            Command::Complete { prefix } => {
                for item in completions(&prefix) {
                    println!("{:<20} {}", item.label, item.detail);
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::LogGroups { prefix } => {
                let Ok(groups) = self.controller.load_log_groups(prefix.as_deref()).await else {
                    return Ok(ExitCode::FAILURE);
                };
                for group in groups {
                    println!("{group}");
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::History => self.history().await,
            Command::Saved { command } => self.saved(command),
            Command::Record { pointer } => {
                let record = self
                    .service
                    .get_log_record(&pointer)
                    .await
                    .with_context(|| format!("Failed to fetch log record {pointer}"))?;
                for (field, value) in record {
                    println!("{field}: {value}");
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Profiles => {
                let config = self.state.config();
                println!("* {} ({})", self.profile.name, self.profile.region);
                for name in config.profile_names() {
                    if name != self.profile.name {
                        println!("  {name}");
                    }
                }
                Ok(ExitCode::SUCCESS)
            }
        }
    }

    async fn query(&self, args: QueryArgs) -> Result<ExitCode> {
        let controller = &self.controller;

        if args.last && !controller.restore_last_run() {
            bail!("No previous run to restore");
        }
        if let Some(name) = &args.saved {
            let saved = controller
                .find_saved_query(name)?
                .with_context(|| format!("No saved query named '{name}'"))?;
            controller.apply_saved_query(&saved);
        }
        if let Some(query) = read_source(&args.source)? {
            controller.set_query(query);
        }
        if !args.log_groups.is_empty() {
            controller.set_log_groups(args.log_groups.clone());
        }
        if let Some(range) = time_range(&args)? {
            controller.set_time_range(range);
        }
        if args.format {
            controller.format_query();
        }

        tracing::debug!(
            log_groups = ?controller.selected_log_groups(),
            range = %controller.time_range().describe(),
            "Running query"
        );

        let printer = tokio::spawn(print_status(controller.subscribe_status()));

        let run = controller.run();
        tokio::pin!(run);
        let mut stopping = false;
        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                _ = tokio::signal::ctrl_c(), if !stopping => {
                    stopping = true;
                    eprintln!("Stopping query...");
                    // Failures are reported by the notifier; the run keeps polling.
                    if controller.cancel().await.is_err() {
                        stopping = false;
                    }
                }
            }
        };
        printer.abort();

        match result {
            Ok(QueryOutcome::Complete { .. }) => {}
            Ok(QueryOutcome::Cancelled { query_id }) => {
                eprintln!("Query {query_id} cancelled");
                return Ok(ExitCode::from(130));
            }
            Ok(QueryOutcome::Rejected) => bail!("A query is already running"),
            Err(_) => return Ok(ExitCode::FAILURE),
        }

        if let Some(banner) = controller.status_banner() {
            eprintln!("{banner}");
        }

        let results = controller.results();
        if results.is_empty() {
            println!("No results");
            return Ok(ExitCode::SUCCESS);
        }

        if args.expand {
            for fetch in controller.toggle_all() {
                fetch.await.context("Log record fetch task failed")?;
            }
        }

        if args.json {
            let rows: Vec<_> = results
                .rows
                .iter()
                .map(|row| {
                    let mut value = serde_json::to_value(&row.values).unwrap_or_default();
                    if let (Some(DetailState::Loaded(record)), Some(obj)) =
                        (controller.detail(&row.id), value.as_object_mut())
                    {
                        obj.insert("@record".to_string(), serde_json::json!(record));
                    }
                    value
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(ExitCode::SUCCESS);
        }

        println!("{}", controller.render_results(args.width));
        if let Some(group) = controller.results_log_group() {
            tracing::debug!(log_group = %group, "Stream links available");
        }

        if args.expand {
            for row in &results.rows {
                match controller.detail(&row.id) {
                    Some(DetailState::Loaded(record)) => {
                        println!("\n# {}", row.id);
                        for (field, value) in record {
                            println!("  {field}: {value}");
                        }
                    }
                    Some(DetailState::Failed(message)) => println!("\n# {}\n  {message}", row.id),
                    Some(DetailState::Loading) | None => {}
                }
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn history(&self) -> Result<ExitCode> {
        if self.controller.toggle_drawer(DrawerId::History).is_none() {
            tracing::debug!("History drawer unavailable");
        }
        let Ok(items) = self.controller.load_history().await else {
            return Ok(ExitCode::FAILURE);
        };

        for item in items {
            let marker = if item.succeeded { " " } else { "!" };
            println!("{marker} {:<12} {:<16} {}", item.status, item.age, item.query_id);
            if !item.log_groups.is_empty() {
                println!("    {}", item.log_groups);
            }
            println!("    {}", item.query.trim());
        }
        Ok(ExitCode::SUCCESS)
    }

    fn saved(&self, command: SavedCommand) -> Result<ExitCode> {
        let controller = &self.controller;
        controller.toggle_drawer(DrawerId::SavedQueries);

        match command {
            SavedCommand::List { filter } => {
                for saved in controller.saved_queries(&filter) {
                    println!("{}  {}", saved.id, saved.name);
                    if !saved.log_groups.is_empty() {
                        println!("    {}", saved.log_groups.join(", "));
                    }
                    for line in saved.query.lines() {
                        println!("    {line}");
                    }
                }
            }
            SavedCommand::Add { name, source, log_groups } => {
                let existing = controller.find_saved_query(&name)?.map(|s| s.id);
                controller.set_query(read_source(&source)?.unwrap_or_default());
                controller.set_log_groups(log_groups);
                if controller.save_current_query(&name, existing).is_err() {
                    return Ok(ExitCode::FAILURE);
                }
            }
            SavedCommand::Remove { name } => {
                let saved = controller
                    .find_saved_query(&name)?
                    .with_context(|| format!("No saved query named '{name}'"))?;
                controller.delete_saved_query(saved.id)?;
                eprintln!("{}: Deleted '{}'", ToastSeverity::Success.label(), saved.name);
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Print the banner at each poll and on the final snapshot.
async fn print_status(mut rx: tokio::sync::watch::Receiver<Option<QueryRunStatus>>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        let Some(status) = snapshot else { continue };
        if status.kind == StatusKind::InProgress && status.time_left == POLL_INTERVAL_SECS {
            eprintln!("{}", banner_text(&status));
        }
    }
}

fn read_source(source: &SourceArgs) -> Result<Option<String>> {
    if let Some(path) = &source.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file {}", path.display()))?;
        return Ok(Some(text));
    }
    Ok(source.query.clone())
}

fn time_range(args: &QueryArgs) -> Result<Option<TimeRange>> {
    if let Some(since) = &args.since {
        return Ok(Some(TimeRange::parse_relative(since)?));
    }
    if args.start.is_none() && args.end.is_none() {
        return Ok(None);
    }

    let parse = |value: &Option<String>| -> Result<Option<DateTime<Utc>>> {
        value
            .as_deref()
            .map(|v| {
                DateTime::parse_from_rfc3339(v)
                    .map(|d| d.with_timezone(&Utc))
                    .with_context(|| format!("Invalid timestamp '{v}'"))
            })
            .transpose()
    };
    Ok(Some(TimeRange::Absolute { start: parse(&args.start)?, end: parse(&args.end)? }))
}
