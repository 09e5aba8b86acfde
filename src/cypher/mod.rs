//! Cypher statements and results
//!
//! - `statement`: [`Statement`] and its wire form
//! - `normalize`: best-effort whitespace collapsing
//! - `result`: [`TabularResult`] and the name-matching decoder
//! - `wire`: request/response bodies shared by autocommit and transactions
//! - `errors`: encode, decode and statement-level errors

mod errors;
mod normalize;
mod result;
mod statement;
pub(crate) mod wire;

pub use errors::{DecodeError, EncodeError, StatementError, StatementErrors};
pub use normalize::normalize_whitespace;
pub use result::{ColumnInto, DecodeTarget, RowsInto, TabularResult};
pub use statement::{Statement, WireStatement};
