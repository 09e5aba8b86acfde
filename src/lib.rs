//! cypherlink - a client for graph databases speaking Cypher over HTTP/JSON
//!
//! - [`cypher`]: statements, their wire encoding and typed result decoding
//! - [`tx`]: multi-request transactions
//! - [`batch`]: many REST jobs in one request, with forward references
//! - [`database`]: the handle tying these to a server
//!
//! ```ignore
//! use cypherlink::{ClientConfig, Database, Statement};
//!
//! let db = Database::connect(&ClientConfig::with_url("http://localhost:7474/db/data/"))?;
//! let mut names: Vec<String> = Vec::new();
//! let mut stmt = Statement::new("MATCH (n:Person) RETURN n.name").into_column(&mut names);
//! db.cypher(&mut stmt)?;
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod cypher;
pub mod database;
pub mod errors;
pub mod observability;
pub mod transport;
pub mod tx;

pub use batch::{Batch, BatchError, JobId, JobRef, JobResult, NodeRef, Target};
pub use config::ClientConfig;
pub use cypher::{
    DecodeError, DecodeTarget, EncodeError, Statement, StatementError, StatementErrors,
    TabularResult,
};
pub use database::{Database, ServiceRoot};
pub use errors::{Error, ErrorTier, Result};
pub use transport::{HttpTransport, ScriptedTransport, Transport};
pub use tx::{Transaction, TxState, TxStateError};
