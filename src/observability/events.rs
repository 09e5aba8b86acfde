//! Observable client events
//!
//! Events are explicit and typed; every network-visible step of the
//! statement, transaction and batch protocols has one.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Connection
    /// Service root discovered
    ServiceRootLoaded,

    // Autocommit statements
    /// Autocommit request about to be sent
    CypherBegin,
    /// Autocommit request answered
    CypherComplete,

    // Transactions
    /// Begin request about to be sent
    TxBegin,
    /// Server opened the transaction
    TxOpen,
    /// Statements run inside an open transaction
    TxQuery,
    /// Transaction committed
    TxCommit,
    /// Commit refused locally because statement errors are pending
    TxCommitRefused,
    /// Transaction rolled back
    TxRollback,
    /// Server no longer knows the transaction
    TxExpired,
    /// Exchange succeeded but statements failed
    TxStatementErrors,

    // Batches
    /// Batch request about to be sent
    BatchExecuteBegin,
    /// Batch responses attached to their jobs
    BatchExecuteComplete,

    // Failures
    /// HTTP exchange failed
    TransportFailed,
    /// Unexpected status code
    ProtocolFailed,
    /// Result could not be decoded into its target
    DecodeFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ServiceRootLoaded => "SERVICE_ROOT_LOADED",

            Event::CypherBegin => "CYPHER_BEGIN",
            Event::CypherComplete => "CYPHER_COMPLETE",

            Event::TxBegin => "TX_BEGIN",
            Event::TxOpen => "TX_OPEN",
            Event::TxQuery => "TX_QUERY",
            Event::TxCommit => "TX_COMMIT",
            Event::TxCommitRefused => "TX_COMMIT_REFUSED",
            Event::TxRollback => "TX_ROLLBACK",
            Event::TxExpired => "TX_EXPIRED",
            Event::TxStatementErrors => "TX_STATEMENT_ERRORS",

            Event::BatchExecuteBegin => "BATCH_EXECUTE_BEGIN",
            Event::BatchExecuteComplete => "BATCH_EXECUTE_COMPLETE",

            Event::TransportFailed => "TRANSPORT_FAILED",
            Event::ProtocolFailed => "PROTOCOL_FAILED",
            Event::DecodeFailed => "DECODE_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::TransportFailed | Event::ProtocolFailed => Severity::Error,
            Event::TxStatementErrors
            | Event::TxCommitRefused
            | Event::TxExpired
            | Event::DecodeFailed => Severity::Warn,
            Event::CypherBegin | Event::BatchExecuteBegin | Event::TxBegin => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
