//! CLI command implementations
//!
//! Commands are thin wrappers over the library: JSON in on stdin, one JSON
//! envelope out on stdout. Diagnostics go to stderr through `env_logger`
//! (`RUST_LOG`, default `warn`).

use serde::Deserialize;
use serde_json::{json, Value};

use crate::batch::Target;
use crate::config::ClientConfig;
use crate::cypher::Statement;
use crate::database::Database;
use crate::errors::ErrorTier;
use crate::observability::Logger;
use crate::transport::Method;
use crate::tx::{Transaction, TxState};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_requests, write_error, write_response};

/// One statement as read from stdin
#[derive(Debug, Clone, Deserialize)]
struct StatementInput {
    statement: String,
    #[serde(default)]
    parameters: Option<Value>,
}

impl StatementInput {
    fn into_statement(self) -> Statement<'static> {
        Statement::new(self.statement).params(self.parameters)
    }
}

/// One batch job as read from stdin
#[derive(Debug, Clone, Deserialize)]
struct JobInput {
    method: Method,
    to: String,
    #[serde(default)]
    body: Option<Value>,
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command. Failures are
/// also reported as an error envelope on stdout.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging();

    let result = run_command(&cli);
    if let Err(ref e) = result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cli: &Cli) -> CliResult<()> {
    let config = load_config(cli)?;
    match &cli.command {
        Command::Ping => ping(&config),
        Command::Query { statement, params } => {
            query(&config, statement.as_deref(), params.as_deref())
        }
        Command::Tx => tx(&config),
        Command::Batch => batch(&config),
    }
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    // A logger may already be installed when embedded.
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Configuration file (if given) with `--url` applied on top
fn load_config(cli: &Cli) -> CliResult<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path).map_err(|e| CliError::config_error(e.to_string()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    config
        .validate()
        .map_err(|e| CliError::config_error(e.to_string()))?;
    Ok(config)
}

/// Read the service root
pub fn ping(config: &ClientConfig) -> CliResult<()> {
    let db = Database::connect(config)?;
    write_response(serde_json::to_value(db.service_root())?)
}

/// Run one statement in its own transaction
pub fn query(config: &ClientConfig, statement: Option<&str>, params: Option<&str>) -> CliResult<()> {
    let input = match statement {
        Some(text) => StatementInput {
            statement: text.to_string(),
            parameters: params.map(serde_json::from_str::<Value>).transpose()?,
        },
        None => serde_json::from_value(read_request()?)?,
    };

    let db = Database::connect(config)?;
    let mut statement = input.into_statement();
    db.cypher(&mut statement)?;
    write_response(serde_json::to_value(statement.result())?)
}

/// Run stdin statements in one transaction.
///
/// Commits when every statement succeeds; otherwise rolls back and reports
/// the statement errors.
pub fn tx(config: &ClientConfig) -> CliResult<()> {
    let inputs = read_requests()?
        .into_iter()
        .map(serde_json::from_value::<StatementInput>)
        .collect::<Result<Vec<_>, _>>()?;
    let mut statements: Vec<Statement<'static>> =
        inputs.into_iter().map(StatementInput::into_statement).collect();

    let db = Database::connect(config)?;
    let mut tx = db.transaction();
    begin_or_abandon(&mut tx, &mut statements)?;
    tx.commit()?;

    let results = statements
        .iter()
        .map(|s| serde_json::to_value(s.result()))
        .collect::<Result<Vec<_>, _>>()?;
    write_response(json!({
        "state": tx.state().as_str(),
        "results": results,
    }))
}

/// Begins `tx`. On statement errors the open transaction is rolled back; a
/// failed rollback is only logged so the statement errors are what the
/// caller sees.
fn begin_or_abandon(
    tx: &mut Transaction<'_>,
    statements: &mut [Statement<'_>],
) -> CliResult<()> {
    let err = match tx.begin(statements) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    if err.tier() == ErrorTier::Statement && tx.state() == TxState::Open {
        if let Err(rollback) = tx.rollback() {
            let reason = rollback.to_string();
            Logger::warn(
                "CLI_ROLLBACK_FAILED",
                &[("code", rollback.code()), ("reason", reason.as_str())],
            );
        }
    }
    Err(err.into())
}

/// Send the stdin job array as one batch
pub fn batch(config: &ClientConfig) -> CliResult<()> {
    let jobs: Vec<JobInput> = serde_json::from_value(read_request()?)?;

    let db = Database::connect(config)?;
    let batch = db.batch();
    for job in jobs {
        batch.enqueue(job.method, Target::parse(&job.to), job.body)?;
    }
    let results = batch.execute()?;
    write_response(serde_json::to_value(results)?)
}
