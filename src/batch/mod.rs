//! Batched REST jobs
//!
//! A [`Batch`] collects jobs (`{"id", "method", "to", "body"}`) and sends
//! them to the batch endpoint in a single request. Later jobs can address
//! entities created by earlier ones through `{id}` forward references,
//! which the server resolves.

#[allow(clippy::module_inception)]
mod batch;
mod errors;
mod job;

pub use batch::Batch;
pub use errors::BatchError;
pub use job::{JobId, JobRef, JobResult, NodeRef, Target};
