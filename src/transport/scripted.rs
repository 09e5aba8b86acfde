//! Scripted transport for tests and offline use
//!
//! Answers requests either from a FIFO of canned outcomes or from a handler
//! closure, and records every request it sees.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{HttpRequest, HttpResponse, Transport, TransportError, TransportResult};

type Handler = Box<dyn Fn(&HttpRequest) -> TransportResult<HttpResponse> + Send + Sync>;

/// A [`Transport`] that never touches the network.
///
/// Canned outcomes are consumed first; once they run out the handler (if
/// any) answers. With neither, the request fails with a connect error.
pub struct ScriptedTransport {
    queued: Mutex<VecDeque<TransportResult<HttpResponse>>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Transport with no canned responses and no handler
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            handler: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transport answering every request with `handler`
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> TransportResult<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            queued: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response for the next unanswered request
    pub fn push_response(&self, response: HttpResponse) {
        self.lock_queue().push_back(Ok(response));
    }

    /// Queues a transport failure for the next unanswered request
    pub fn push_error(&self, error: TransportError) {
        self.lock_queue().push_back(Err(error));
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of requests seen so far
    pub fn request_count(&self) -> usize {
        match self.requests.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<TransportResult<HttpResponse>>> {
        match self.queued.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        if let Some(outcome) = self.lock_queue().pop_front() {
            return outcome;
        }
        match self.handler {
            Some(ref handler) => handler(request),
            None => Err(TransportError::Connect(format!(
                "no scripted response for {} {}",
                request.method, request.url
            ))),
        }
    }
}
