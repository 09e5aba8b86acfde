//! Wire transport
//!
//! The core never talks to the network directly. Every round trip goes
//! through a [`Transport`]: one request with an optional JSON body in, one
//! status code with an optional JSON body out.
//!
//! - [`HttpTransport`] is the production implementation (blocking reqwest).
//! - [`ScriptedTransport`] answers from canned responses or a handler closure
//!   and records every request, for tests and offline use.

mod errors;
mod http;
mod scripted;

pub use errors::{TransportError, TransportResult};
pub use http::HttpTransport;
pub use scripted::ScriptedTransport;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outgoing HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Request without a body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    /// Request carrying a JSON body
    pub fn with_body(method: Method, url: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// One completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// `Location` header, if the server sent one
    pub location: Option<String>,
    /// Parsed JSON body; `None` for an empty body
    pub body: Option<Value>,
}

impl HttpResponse {
    /// Response with a JSON body
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            location: None,
            body: Some(body),
        }
    }

    /// Response with an empty body
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: None,
        }
    }

    /// Sets the `Location` header
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Performs single HTTP round trips.
///
/// Implementations must be shareable across threads; the core issues at most
/// one request per logical operation and never retries.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        (**self).send(request)
    }
}

/// Joins URL fragments with single slashes
pub fn join_url(fragments: &[&str]) -> String {
    let parts: Vec<&str> = fragments
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i == 0 {
                part.trim_end_matches('/')
            } else {
                part.trim_matches('/')
            }
        })
        .filter(|part| !part.is_empty())
        .collect();
    parts.join("/")
}
