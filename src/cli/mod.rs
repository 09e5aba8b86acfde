//! CLI module for cypherlink
//!
//! Provides command-line interface for:
//! - ping: Read the service root
//! - query: One-shot autocommit statement
//! - tx: Statements from stdin in one transaction
//! - batch: Jobs from stdin in one batch request

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{batch, ping, query, run, run_command, tx};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, read_requests, write_error, write_response};
