//! Batch coordinator

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{json, Value};

use super::errors::BatchError;
use super::job::{Job, JobId, JobRef, JobResult, NodeRef, Target, WireJob};
use crate::cypher::EncodeError;
use crate::database::Database;
use crate::errors::{Error, Result};
use crate::observability::{log_event_with_fields, Event};
use crate::transport::{HttpRequest, Method, TransportError};

#[derive(Default)]
struct BatchQueue {
    jobs: Vec<Job>,
    results: BTreeMap<JobId, JobResult>,
    executed: bool,
}

/// A queue of REST jobs sent to the server in one request.
///
/// Jobs can be enqueued from several threads; each gets the queue length at
/// enqueue time as its ID. [`execute`](Self::execute) holds the queue lock
/// for the whole round trip, so an enqueue racing it waits and is then
/// rejected with [`BatchError::AlreadyExecuted`]. A batch executes at most
/// once.
pub struct Batch<'db> {
    db: &'db Database,
    queue: Mutex<BatchQueue>,
}

impl<'db> Batch<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            queue: Mutex::new(BatchQueue::default()),
        }
    }

    /// Queues a job. A [`Target::Job`] must name a job already in the queue.
    pub fn enqueue(
        &self,
        method: Method,
        target: impl Into<Target>,
        body: Option<Value>,
    ) -> Result<JobRef> {
        let target = target.into();
        let mut queue = self.lock();
        if queue.executed {
            return Err(BatchError::AlreadyExecuted.into());
        }
        if let Some(id) = target.referenced_job() {
            if id >= queue.jobs.len() {
                return Err(BatchError::UnknownJob(id).into());
            }
        }

        let id = queue.jobs.len();
        queue.jobs.push(Job {
            method,
            target,
            body,
        });
        Ok(JobRef::new(id))
    }

    /// Queues a job whose body is any serializable value
    pub fn enqueue_json<B: Serialize>(
        &self,
        method: Method,
        target: impl Into<Target>,
        body: &B,
    ) -> Result<JobRef> {
        let body = to_body(body)?;
        self.enqueue(method, target, Some(body))
    }

    /// Creates a node with `properties`
    pub fn create_node<P: Serialize>(&self, properties: &P) -> Result<JobRef> {
        let url = self.db.service_root().node.clone();
        self.enqueue_json(Method::Post, url, properties)
    }

    /// Creates a relationship of `rel_type` from `from` to `to`.
    ///
    /// `properties` serializing to `null` (such as `()`) sends no data.
    pub fn relate<P: Serialize>(
        &self,
        from: &NodeRef,
        rel_type: &str,
        to: &NodeRef,
        properties: &P,
    ) -> Result<JobRef> {
        let mut body = json!({
            "to": to.identity(),
            "type": rel_type,
        });
        let data = to_body(properties)?;
        if !data.is_null() {
            body["data"] = data;
        }
        self.enqueue(Method::Post, from.target("relationships"), Some(body))
    }

    /// Deletes the entity at `target`
    pub fn delete(&self, target: impl Into<Target>) -> Result<JobRef> {
        self.enqueue(Method::Delete, target, None)
    }

    /// Replaces every property of `entity`
    pub fn set_properties<P: Serialize>(&self, entity: &NodeRef, properties: &P) -> Result<JobRef> {
        self.enqueue_json(Method::Put, entity.target("properties"), properties)
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_executed(&self) -> bool {
        self.lock().executed
    }

    /// Sends every queued job in one request and returns each job's result
    /// keyed by job ID.
    ///
    /// Responses are matched to jobs by ID, not position. A transport or
    /// protocol failure (including a response that does not account for
    /// every job exactly once) leaves every job without a result. A job the
    /// server reports as failed still gets its result; see
    /// [`JobResult::is_failure`].
    ///
    /// An empty batch sends nothing. The batch is spent once this is
    /// called, whatever the outcome.
    pub fn execute(&self) -> Result<BTreeMap<JobId, JobResult>> {
        let mut queue = self.lock();
        if queue.executed {
            return Err(BatchError::AlreadyExecuted.into());
        }
        queue.executed = true;

        let count = queue.jobs.len();
        if count == 0 {
            return Ok(BTreeMap::new());
        }

        let wire: Vec<WireJob> = queue
            .jobs
            .iter()
            .enumerate()
            .map(|(id, job)| WireJob::from_job(id, job))
            .collect();
        let body = serde_json::to_value(&wire)
            .map_err(|e| Error::Transport(TransportError::Serialize(e.to_string())))?;

        let jobs = count.to_string();
        log_event_with_fields(Event::BatchExecuteBegin, &[("jobs", jobs.as_str())]);

        let url = self.db.service_root().batch.clone();
        let response = self
            .db
            .exchange("batch", HttpRequest::with_body(Method::Post, url, body), &[200])?;
        self.db.metrics().record_batch(count as u64);

        let results = demultiplex(count, response.body)?;
        let failed = results.values().filter(|r| r.is_failure()).count().to_string();
        queue.results = results.clone();

        log_event_with_fields(
            Event::BatchExecuteComplete,
            &[("jobs", jobs.as_str()), ("failed", failed.as_str())],
        );
        Ok(results)
    }

    /// Result recorded for `job` by [`execute`](Self::execute)
    pub fn result(&self, job: JobRef) -> Result<JobResult> {
        let queue = self.lock();
        if !queue.executed {
            return Err(BatchError::NotExecuted.into());
        }
        queue
            .results
            .get(&job.id())
            .cloned()
            .ok_or_else(|| BatchError::NoResult(job.id()).into())
    }

    fn lock(&self) -> MutexGuard<'_, BatchQueue> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| {
        Error::Encode(EncodeError::InvalidBody {
            reason: e.to_string(),
        })
    })
}

/// Parses the batch response and checks it names every job exactly once
fn demultiplex(count: usize, body: Option<Value>) -> Result<BTreeMap<JobId, JobResult>> {
    let bad = |reason: String| Error::BadResponse {
        operation: "batch",
        reason,
    };

    let entries: Vec<JobResult> = match body {
        Some(body) => serde_json::from_value(body).map_err(|e| bad(e.to_string()))?,
        None => return Err(bad("empty batch response".to_string())),
    };

    let mut seen = BTreeSet::new();
    for entry in &entries {
        if entry.id >= count {
            return Err(bad(format!("response names unknown job {}", entry.id)));
        }
        if !seen.insert(entry.id) {
            return Err(bad(format!("response names job {} twice", entry.id)));
        }
    }
    if seen.len() != count {
        return Err(bad(format!(
            "response covers {} of {} jobs",
            seen.len(),
            count
        )));
    }

    Ok(entries.into_iter().map(|entry| (entry.id, entry)).collect())
}
