// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// schema-manager - Versioned database schema change runner
///
/// Applies numbered schema change folders to a database in order,
/// then runs the always-run scripts.
#[derive(Parser, Debug)]
#[command(name = "schema-manager")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned database schema change runner")]
#[command(long_about = "schema-manager - Versioned database schema change runner

Each schema change lives in a folder named {previous}_{version}[_{description}]
containing Forward.sql and Back.sql. Versions have four numeric parts
(major.minor.point.step) and every change must chain onto the previous one.

schema-manager helps you:
  • Bring a database up to the latest (or a chosen) revision
  • Commit once per run or once per change
  • Re-run always-run scripts (views, grants, procedures) on every update
  • Inspect which changes are pending before applying them

Supported databases: PostgreSQL, MySQL, SQLite")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Create .schema-manager.yaml with your database settings
  2. Add change folders:       ChangeScripts/0.0.0.0_1.0.0.0_create_users/
  3. Check the change chain:   schema-manager list
  4. Check pending changes:    schema-manager status
  5. Apply them:               schema-manager update

For detailed help on each command, use: schema-manager <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending schema changes to the database
    ///
    /// Applies every change newer than the database revision (up to the
    /// target revision, if any) in ascending order, then runs the
    /// always-run scripts.
    ///
    /// EXAMPLES:
    ///   # Update the development database
    ///   schema-manager update
    ///
    ///   # Stop at a specific revision
    ///   schema-manager update --target 1.2.0.0
    ///
    ///   # Commit after each change in production
    ///   schema-manager update --env production --incremental --timeout 60
    Update {
        /// Target environment (development, staging, production)
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// Highest revision to apply (major.minor.point.step)
        #[arg(short, long, value_name = "VERSION")]
        target: Option<String>,

        /// Commit after each change instead of once per run
        #[arg(long)]
        incremental: bool,

        /// Timeout for database operations (in seconds)
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },

    /// Show the database revision and pending changes
    ///
    /// EXAMPLES:
    ///   # Show status for development
    ///   schema-manager status
    ///
    ///   # Show status for production
    ///   schema-manager status --env production
    Status {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,
    },

    /// List and validate the schema change chain
    ///
    /// Reads the change folders and always-run scripts without
    /// connecting to a database.
    ///
    /// EXAMPLES:
    ///   schema-manager list
    ///   schema-manager list --format json
    List,
}
