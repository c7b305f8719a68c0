//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Quartermaster - bank ledger and task scheduler for a merchant agent
#[derive(Parser)]
#[command(
    name = "qm",
    about = "Bank ledger and cooperative task scheduler for a remote-inventory agent",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/quartermaster/logs/quartermaster.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Show container usage and item totals of a bank snapshot
    Inspect {
        /// JSON bank snapshot
        snapshot: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show upgrade and compound plans for a bank snapshot
    Plan {
        /// JSON bank snapshot
        snapshot: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the merchant tasks against a simulated actor
    Simulate {
        /// JSON bank snapshot to seed the simulated bank with
        snapshot: PathBuf,

        /// JSON array of inventory slots (`null` for empty)
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Gold carried by the simulated actor
        #[arg(short, long, default_value = "0")]
        gold: u64,

        /// Inventory size of the simulated actor
        #[arg(long, default_value = "42")]
        slots: usize,

        /// Number of check rounds to run
        #[arg(short, long, default_value = "3")]
        rounds: usize,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for commands that report data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
