//! Transaction misuse errors
//!
//! Raised locally, before anything is sent.

use thiserror::Error;

use super::state::TxState;

/// Operation not allowed in the transaction's current state
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TxStateError {
    #[error("transaction has not been started")]
    NotStarted,

    #[error("transaction has already been started")]
    AlreadyStarted,

    #[error("transaction is {0}")]
    Terminated(TxState),

    /// Commit refused while statement errors are pending
    #[error("commit refused: {0} statement error(s) pending; roll back instead")]
    PendingStatementErrors(usize),
}

impl TxStateError {
    pub fn code(&self) -> &'static str {
        match self {
            TxStateError::NotStarted => "LINK_TX_NOT_STARTED",
            TxStateError::AlreadyStarted => "LINK_TX_ALREADY_STARTED",
            TxStateError::Terminated(_) => "LINK_TX_TERMINATED",
            TxStateError::PendingStatementErrors(_) => "LINK_TX_PENDING_ERRORS",
        }
    }
}
