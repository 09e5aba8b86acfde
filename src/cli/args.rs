//! CLI argument definitions using clap
//!
//! Commands:
//! - cypherlink ping
//! - cypherlink query [STATEMENT] [--params <json>]
//! - cypherlink tx
//! - cypherlink batch
//!
//! Every command accepts `--config <path>` and `--url <url>`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cypherlink - Cypher over HTTP from the command line
#[derive(Parser, Debug)]
#[command(name = "cypherlink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Service root URL; overrides the configuration file
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the service root and print it
    Ping,

    /// Run one statement in its own transaction
    Query {
        /// Statement text; when absent, read {"statement", "parameters"} from stdin
        statement: Option<String>,

        /// Parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Run statements from stdin, one JSON object per line, in one
    /// transaction; commit when all succeed, roll back otherwise
    Tx,

    /// Send the JSON array of jobs on stdin as one batch
    Batch,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
