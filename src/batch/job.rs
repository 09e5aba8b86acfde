//! Batch jobs, targets and results

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cypher::DecodeError;
use crate::transport::{join_url, Method};

/// Position of a job in its batch, assigned at enqueue time
pub type JobId = usize;

/// Handle to an enqueued job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobRef {
    id: JobId,
}

impl JobRef {
    pub(crate) fn new(id: JobId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Forward reference to this job's created entity, `{id}`, usable in
    /// later jobs of the same batch. The server resolves it.
    pub fn identity(&self) -> String {
        format!("{{{}}}", self.id)
    }
}

/// Where a job is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Absolute URL
    Url(String),
    /// Entity created by an earlier job, optionally with a sub-path
    Job { id: JobId, path: Option<String> },
}

impl Target {
    /// Sub-resource of an entity created by `job`
    pub fn job_path(job: JobRef, path: impl Into<String>) -> Self {
        Target::Job {
            id: job.id,
            path: Some(path.into()),
        }
    }

    /// Reads a `to` string: `{id}` or `{id}/path` is a forward reference,
    /// anything else a URL
    pub fn parse(to: &str) -> Self {
        let reference = to
            .strip_prefix('{')
            .and_then(|rest| rest.split_once('}'))
            .and_then(|(id, path)| Some((id.trim().parse::<JobId>().ok()?, path)));
        match reference {
            Some((id, path)) => {
                let path = path.trim_start_matches('/');
                Target::Job {
                    id,
                    path: (!path.is_empty()).then(|| path.to_string()),
                }
            }
            None => Target::Url(to.to_string()),
        }
    }

    /// The `to` string sent on the wire
    pub fn render(&self) -> String {
        match self {
            Target::Url(url) => url.clone(),
            Target::Job { id, path: None } => format!("{{{}}}", id),
            Target::Job { id, path: Some(path) } => join_url(&[&format!("{{{}}}", id), path]),
        }
    }

    pub(crate) fn referenced_job(&self) -> Option<JobId> {
        match self {
            Target::Url(_) => None,
            Target::Job { id, .. } => Some(*id),
        }
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Target::Url(url.to_string())
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Target::Url(url)
    }
}

impl From<JobRef> for Target {
    fn from(job: JobRef) -> Self {
        Target::Job { id: job.id, path: None }
    }
}

/// A node (or relationship) that either exists already or is created by an
/// earlier job in the same batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Existing(String),
    Pending(JobRef),
}

impl NodeRef {
    /// URL, or `{id}` forward reference
    pub fn identity(&self) -> String {
        match self {
            NodeRef::Existing(url) => url.clone(),
            NodeRef::Pending(job) => job.identity(),
        }
    }

    /// Target for a sub-resource of this entity
    pub fn target(&self, path: &str) -> Target {
        match self {
            NodeRef::Existing(url) => Target::Url(join_url(&[url, path])),
            NodeRef::Pending(job) => Target::job_path(*job, path),
        }
    }
}

impl From<JobRef> for NodeRef {
    fn from(job: JobRef) -> Self {
        NodeRef::Pending(job)
    }
}

impl From<&str> for NodeRef {
    fn from(url: &str) -> Self {
        NodeRef::Existing(url.to_string())
    }
}

impl From<String> for NodeRef {
    fn from(url: String) -> Self {
        NodeRef::Existing(url)
    }
}

/// A queued job
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub method: Method,
    pub target: Target,
    pub body: Option<Value>,
}

/// `{"id", "method", "to", "body"}`; `body` is omitted when absent
#[derive(Debug, Serialize)]
pub(crate) struct WireJob {
    pub id: JobId,
    pub method: Method,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl WireJob {
    pub fn from_job(id: JobId, job: &Job) -> Self {
        Self {
            id,
            method: job.method,
            to: job.target.render(),
            body: job.body.clone(),
        }
    }
}

/// Outcome of one job, as the server reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: JobId,
    /// URL of the created or addressed entity
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Per-job status, when the server reports one
    #[serde(default)]
    pub status: Option<u16>,
    /// The `to` the server resolved for this job
    #[serde(default)]
    pub from: Option<String>,
}

impl JobResult {
    /// True when the server reported a failing status for this job
    pub fn is_failure(&self) -> bool {
        self.status.map_or(false, |s| s >= 400)
    }

    /// Numeric entity ID: the last path segment of `location`
    pub fn entity_id(&self) -> Option<u64> {
        self.location
            .as_deref()?
            .trim_end_matches('/')
            .rsplit('/')
            .next()?
            .parse()
            .ok()
    }

    /// Deserializes the body; a missing body decodes as `null`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let body = self.body.clone().unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|e| DecodeError::Body {
            job: self.id,
            message: e.to_string(),
        })
    }
}
