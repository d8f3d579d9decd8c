//! CLI argument definitions for Ballpark.

use clap::{Parser, Subcommand};

/// Ballpark - software-effort estimation from seeded and tracked time data.
///
/// Start with `bp system init`, seed features with `bp feature add`, log or
/// import tracked time, then `bp estimate` the next project.
#[derive(Parser, Debug)]
#[command(name = "bp")]
#[command(author, version, about = "A CLI tool for estimating software-project effort", long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (", env!("BP_GIT_COMMIT"), ", built ", env!("BP_BUILD_TIMESTAMP"), ")"
))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if bp was started in <path> instead of the current directory.
    /// The path must exist. Bypasses git root detection - uses the path literally.
    /// Can also be set via BP_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "BP_REPO")]
    pub repo_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feature catalog commands
    Feature {
        #[command(subcommand)]
        command: FeatureCommands,
    },

    /// Tracked-time commands
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },

    /// Show the statistics bundle for one feature
    Stats {
        /// Feature name or synonym
        name: String,
    },

    /// Compute a project estimate for the given feature names
    Estimate {
        /// Feature names (free text; unknown names become new-feature lines)
        names: Vec<String>,

        /// Project-wide experience level (junior, mid, senior)
        #[arg(long)]
        experience: Option<String>,

        /// Hours to assume for names with no catalog match
        #[arg(long = "seed-default")]
        seed_default: Option<f64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show the audit trail of commands
    Log,

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Feature catalog commands
#[derive(Subcommand, Debug)]
pub enum FeatureCommands {
    /// Add a feature to the catalog
    Add {
        /// Display name
        name: String,

        /// Team affinity (frontend, backend, both)
        #[arg(long, default_value = "backend")]
        team: String,

        /// Seed hours used until tracked data exists
        #[arg(long = "seed-hours", allow_negative_numbers = true)]
        seed_hours: f64,

        /// Free grouping label
        #[arg(long)]
        category: Option<String>,

        /// Alternate name resolving to this feature (repeatable)
        #[arg(long = "synonym")]
        synonyms: Vec<String>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List all features, sorted by name
    List,

    /// Show a feature by ID
    Show {
        /// Feature ID (e.g., bpf-a1b2)
        id: String,
    },

    /// Update a feature's seed hours (previous value goes to history)
    SetSeed {
        /// Feature ID
        id: String,

        /// New seed hours
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },

    /// Add a synonym to a feature
    AddSynonym {
        /// Feature ID
        id: String,

        /// The synonym
        synonym: String,
    },

    /// Remove a feature from the catalog
    Rm {
        /// Feature ID
        id: String,
    },

    /// Substring search over names and synonyms
    Search {
        /// Search query
        query: String,
    },
}

/// Tracked-time commands
#[derive(Subcommand, Debug)]
pub enum TimeCommands {
    /// Log a single tracked-time entry
    Add {
        /// Free-text feature label
        feature: String,

        /// Hours spent (positive finite number)
        #[arg(allow_negative_numbers = true)]
        hours: f64,

        /// Team that logged the time (frontend, backend, both)
        #[arg(long, default_value = "backend")]
        team: String,

        /// Member name or identifier
        #[arg(long)]
        member: String,

        /// Optional process/category tag
        #[arg(long)]
        category: Option<String>,

        /// Date the work happened (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Bulk-import entries from a CSV file
    ///
    /// Expected header: team,member,feature,hours[,category][,date].
    /// Bad rows are reported per row number; good rows are ingested.
    Import {
        /// Path to the CSV file
        file: std::path::PathBuf,
    },

    /// List tracked-time entries
    List {
        /// Filter by member
        #[arg(long)]
        member: Option<String>,

        /// Filter by feature label (normalized match)
        #[arg(long)]
        feature: Option<String>,
    },
}

/// Configuration commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get one config value
    Get {
        /// Config key (e.g., estimation-style)
        key: String,
    },

    /// Set one config value
    Set {
        /// Config key (e.g., estimation-style)
        key: String,

        /// New value
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// List all config values
    List,
}

/// System administration commands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize ballpark for this project
    Init,

    /// Rebuild the query cache from the JSONL files
    Rebuild,
}
