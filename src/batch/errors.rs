//! Batch misuse errors

use thiserror::Error;

use super::job::JobId;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BatchError {
    /// Enqueue or execute on a batch that was already sent
    #[error("batch has already been executed")]
    AlreadyExecuted,

    #[error("batch has not been executed")]
    NotExecuted,

    /// Forward reference to a job that is not in the queue
    #[error("job {0} is not in this batch")]
    UnknownJob(JobId),

    #[error("no result recorded for job {0}")]
    NoResult(JobId),
}

impl BatchError {
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::AlreadyExecuted => "LINK_BATCH_ALREADY_EXECUTED",
            BatchError::NotExecuted => "LINK_BATCH_NOT_EXECUTED",
            BatchError::UnknownJob(_) => "LINK_BATCH_UNKNOWN_JOB",
            BatchError::NoResult(_) => "LINK_BATCH_NO_RESULT",
        }
    }
}
