//! Transaction lifecycle states
//!
//! ```text
//! NotStarted --begin--> Open --commit--> Committed
//!                        |  \--rollback--> RolledBack
//!                        |  \--404-------> Expired
//!                        \--transport failure--> Broken
//! ```
//!
//! Every state other than `NotStarted` and `Open` is terminal.

use std::fmt;

/// Where a transaction is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Created locally, nothing sent yet
    NotStarted,
    /// Server holds the transaction open
    Open,
    /// Committed by the server
    Committed,
    /// Rolled back, explicitly or because a commit failed
    RolledBack,
    /// Server no longer knows the transaction
    Expired,
    /// A transport failure left the server-side outcome unknown
    Broken,
}

impl TxState {
    /// True once no further operation is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxState::NotStarted | TxState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxState::NotStarted => "not_started",
            TxState::Open => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled_back",
            TxState::Expired => "expired",
            TxState::Broken => "broken",
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
