//! Command line interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Terminal client for CloudWatch Logs Insights
#[derive(Parser)]
#[command(name = "sonar")]
#[command(version)]
#[command(about = "Run CloudWatch Logs Insights queries from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// AWS profile name
    #[arg(long, env = "SONAR_PROFILE", global = true)]
    pub profile: Option<String>,

    /// AWS region (overrides the profile's region)
    #[arg(long, env = "SONAR_REGION", global = true)]
    pub region: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", env = "SONAR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "sonar_core=debug"
    #[arg(long, value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a query and print the results
    Query(QueryArgs),
    /// Reformat a query with one pipeline stage per line
    Format(SourceArgs),
    /// Suggest completions for a word prefix
    Complete {
        /// Prefix to complete
        #[arg(default_value = "")]
        prefix: String,
    },
    /// List log groups
    LogGroups {
        /// Only groups whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Show recently run queries
    History,
    /// Manage saved queries
    Saved {
        #[command(subcommand)]
        command: SavedCommand,
    },
    /// Fetch one log record by its @ptr value
    Record {
        /// Record pointer
        pointer: String,
    },
    /// List configured profiles
    Profiles,
}

/// Where the query text comes from.
#[derive(Args)]
pub struct SourceArgs {
    /// Query text
    pub query: Option<String>,

    /// Read the query text from a file
    #[arg(short, long, value_name = "FILE", conflicts_with = "query")]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Log group to query (repeatable)
    #[arg(short = 'g', long = "log-group", value_name = "NAME")]
    pub log_groups: Vec<String>,

    /// Relative time range such as 5m, 1h or 7d
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub since: Option<String>,

    /// Range start (RFC 3339)
    #[arg(long)]
    pub start: Option<String>,

    /// Range end (RFC 3339)
    #[arg(long)]
    pub end: Option<String>,

    /// Start from a saved query (name or id)
    #[arg(long, value_name = "NAME")]
    pub saved: Option<String>,

    /// Start from the inputs of the previous run
    #[arg(long)]
    pub last: bool,

    /// Reformat the query before running it
    #[arg(long)]
    pub format: bool,

    /// Fetch and print the full record of every row
    #[arg(long)]
    pub expand: bool,

    /// Print rows as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Maximum cell width of the table
    #[arg(long, default_value_t = 60)]
    pub width: usize,
}

#[derive(Subcommand)]
pub enum SavedCommand {
    /// List saved queries
    List {
        /// Case-insensitive filter over name, query and log groups
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Save a query
    Add {
        /// Name of the saved query
        name: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Log group the query is meant for (repeatable)
        #[arg(short = 'g', long = "log-group", value_name = "NAME")]
        log_groups: Vec<String>,
    },
    /// Delete a saved query by name or id
    Remove {
        name: String,
    },
}
