//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Post-discharge nephrology assistant.
#[derive(Debug, Parser)]
#[command(name = "medai", version, about)]
pub struct Cli {
    /// TOML configuration file (defaults to ./medai.toml when present).
    #[arg(long, global = true, env = "MEDAI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chunk and embed a reference document into an on-disk index.
    Index {
        /// PDF or plain-text document.
        #[arg(long)]
        input: PathBuf,
        /// Output directory (defaults to the configured index_dir).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Start an interactive patient session.
    Chat {
        #[arg(long)]
        index_dir: Option<PathBuf>,
        /// Patient discharge reports (JSON array).
        #[arg(long)]
        patients: Option<PathBuf>,
        /// Do not write the session transcript.
        #[arg(long)]
        no_log: bool,
    },
    /// Look a patient up by full name.
    Lookup {
        name: String,
        #[arg(long)]
        patients: Option<PathBuf>,
    },
}
