//! Multi-request transactions
//!
//! A [`Transaction`] walks the server's transactional endpoint through a
//! small state machine ([`TxState`]). Misuse, such as committing with
//! statement errors pending or touching a finished transaction, is caught
//! locally and reported as a [`TxStateError`].
//!
//! Wire conventions:
//! - begin: `POST {transaction}` expecting 201 and a `Location`
//! - query: `POST {location}` expecting 200
//! - commit: `POST {commit}` expecting 200
//! - rollback: `DELETE {location}` expecting 200
//! - 404 on an open transaction means it expired

mod errors;
mod state;
mod transaction;

pub use errors::TxStateError;
pub use state::TxState;
pub use transaction::Transaction;
