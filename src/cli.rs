//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Builds and queries the ThreatFramework sequential-id index
#[derive(Parser, Debug)]
#[command(name = "tf-index")]
#[command(about = "Assigns per-kind sequential ids to ThreatFramework entities and resolves them")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./tf-index.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================
// Main Commands Enum
// ============================================

/// Available subcommands for tf-index
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the index from the entity database and print it
    #[command(visible_alias = "b")]
    Build(BuildArgs),

    /// Build the index and write it to the index file
    #[command(visible_alias = "e")]
    Export(ExportArgs),

    /// Resolve an entity's sequential id
    #[command(visible_alias = "r")]
    Resolve(ResolveArgs),

    /// Manage tf-index configuration
    Config(ConfigArgs),

    /// Run the WebSocket resolution daemon in the foreground
    Serve(ServeArgs),
}

// ============================================
// Build / Export
// ============================================

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Entity database (overrides database.path)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Document format; `--format json` also selects JSON
    #[arg(long, value_enum, default_value = "yaml")]
    pub output: DocumentFormat,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Entity database (overrides database.path)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Destination file (overrides index.path)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

// ============================================
// Resolve
// ============================================

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Entity kind (component, property, threat, securityRequirement, testCase, library, propertyOption)
    #[arg(value_name = "KIND")]
    pub kind: String,

    /// External identifier of the entity
    #[arg(value_name = "EXTERNAL_ID")]
    pub external_id: String,

    /// Resolve against a persisted index instead of the database
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    pub from_file: Option<PathBuf>,

    /// Entity database (overrides database.path)
    #[arg(long, value_name = "FILE", conflicts_with = "from_file")]
    pub db: Option<PathBuf>,
}

// ============================================
// Config
// ============================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config operation: show, get, set, reset
    #[command(subcommand)]
    pub operation: ConfigOperation,
}

/// Config subcommand operations
#[derive(Subcommand, Debug)]
pub enum ConfigOperation {
    /// Show current configuration
    Show,

    /// Print a single configuration value
    Get {
        /// Configuration key (e.g., index.path, daemon.port)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., database.path, logging.level)
        key: String,
        /// Value to set
        value: String,
    },

    /// Reset configuration to defaults
    Reset,
}

// ============================================
// Serve
// ============================================

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides daemon.host / daemon.port)
    #[arg(long, value_name = "HOST:PORT")]
    pub bind: Option<String>,

    /// Serve from a persisted index instead of the database
    #[arg(long, value_name = "FILE")]
    pub from_file: Option<PathBuf>,

    /// Entity database (overrides database.path)
    #[arg(long, value_name = "FILE", conflicts_with = "from_file")]
    pub db: Option<PathBuf>,
}

// ============================================
// Shared enums
// ============================================

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// JSON for machine parsing
    Json,
}

/// Serialization of a whole index document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}
