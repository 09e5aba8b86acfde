//! Client error types
//!
//! Four tiers are kept apart and never collapsed into one another:
//!
//! 1. Transport: the HTTP exchange failed; nothing received is trustworthy.
//! 2. Protocol: the exchange completed with an unexpected status.
//! 3. Statement: the exchange succeeded but individual statements failed.
//! 4. Decode: purely client-local shape or type mismatch.
//!
//! Misuse of a transaction or batch handle, encode failures and bad
//! configuration are reported as client errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::batch::BatchError;
use crate::cypher::{DecodeError, EncodeError, StatementErrors};
use crate::transport::TransportError;
use crate::tx::TxStateError;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which failure tier an [`Error`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    Transport,
    Protocol,
    Statement,
    Decode,
    Client,
}

impl fmt::Display for ErrorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorTier::Transport => "transport",
            ErrorTier::Protocol => "protocol",
            ErrorTier::Statement => "statement",
            ErrorTier::Decode => "decode",
            ErrorTier::Client => "client",
        };
        write!(f, "{}", s)
    }
}

/// Diagnostic payload the server attached to an unexpected response.
///
/// Older endpoints answer with `message`/`exception`/`stacktrace`; the
/// transactional endpoint answers with an `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerDiagnostic {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub stacktrace: Vec<String>,
    #[serde(default)]
    pub errors: Vec<Value>,
    /// Body that was not a JSON object (e.g. an HTML error page)
    #[serde(skip)]
    pub raw: Option<String>,
}

impl ServerDiagnostic {
    /// Extracts a diagnostic from a response body, if it carries one
    pub fn from_body(body: Option<&Value>) -> Option<Self> {
        match body? {
            Value::String(text) => Some(Self {
                raw: Some(text.clone()),
                ..Default::default()
            }),
            value @ Value::Object(_) => serde_json::from_value::<Self>(value.clone())
                .ok()
                .filter(|d| d.message.is_some() || d.exception.is_some() || !d.errors.is_empty()),
            _ => None,
        }
    }

    /// Best single-line summary of the diagnostic
    pub fn summary(&self) -> String {
        if let Some(ref message) = self.message {
            return message.clone();
        }
        if let Some(first) = self.errors.first() {
            if let Some(message) = first.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
        }
        if let Some(ref exception) = self.exception {
            return exception.clone();
        }
        self.raw.clone().unwrap_or_default()
    }
}

/// Top-level client error
#[derive(Debug, Error)]
pub enum Error {
    // ==================
    // Tier 1: transport
    // ==================
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Expected status but a body that does not have the expected shape.
    /// Nothing in the exchange can be trusted.
    #[error("malformed response to {operation}: {reason}")]
    BadResponse {
        operation: &'static str,
        reason: String,
    },

    // ==================
    // Tier 2: protocol
    // ==================
    /// Unexpected status code for the operation
    #[error("unexpected status {status} for {operation}{}", diagnostic_suffix(.diagnostic))]
    Protocol {
        operation: &'static str,
        status: u16,
        diagnostic: Option<ServerDiagnostic>,
    },

    // ==================
    // Tier 3: statement
    // ==================
    #[error("{0}")]
    Statement(#[from] StatementErrors),

    // ==================
    // Tier 4: decode
    // ==================
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    // ==================
    // Client-local
    // ==================
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("{0}")]
    Transaction(#[from] TxStateError),

    #[error("{0}")]
    Batch(#[from] BatchError),

    #[error("configuration error: {0}")]
    Config(String),
}

fn diagnostic_suffix(diagnostic: &Option<ServerDiagnostic>) -> String {
    match diagnostic {
        Some(d) => {
            let summary = d.summary();
            if summary.is_empty() {
                String::new()
            } else {
                format!(": {}", summary)
            }
        }
        None => String::new(),
    }
}

impl Error {
    /// Build a protocol error, pulling the diagnostic out of `body`
    pub fn protocol(operation: &'static str, status: u16, body: Option<&Value>) -> Self {
        Error::Protocol {
            operation,
            status,
            diagnostic: ServerDiagnostic::from_body(body),
        }
    }

    /// Failure tier of this error
    pub fn tier(&self) -> ErrorTier {
        match self {
            Error::Transport(_) | Error::BadResponse { .. } => ErrorTier::Transport,
            Error::Protocol { .. } => ErrorTier::Protocol,
            Error::Statement(_) => ErrorTier::Statement,
            Error::Decode(_) => ErrorTier::Decode,
            Error::Encode(_) | Error::Transaction(_) | Error::Batch(_) | Error::Config(_) => {
                ErrorTier::Client
            }
        }
    }

    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Transport(e) => e.code(),
            Error::Protocol { status: 404, .. } => "LINK_PROTOCOL_NOT_FOUND",
            Error::Protocol { .. } => "LINK_PROTOCOL_UNEXPECTED_STATUS",
            Error::BadResponse { .. } => "LINK_TRANSPORT_BAD_RESPONSE",
            Error::Statement(_) => "LINK_STATEMENT_FAILED",
            Error::Decode(_) => "LINK_DECODE_FAILED",
            Error::Encode(_) => "LINK_ENCODE_FAILED",
            Error::Transaction(e) => e.code(),
            Error::Batch(e) => e.code(),
            Error::Config(_) => "LINK_CONFIG_INVALID",
        }
    }

    /// HTTP status of a protocol error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Statement errors, if this is a statement-tier error
    pub fn statement_errors(&self) -> Option<&StatementErrors> {
        match self {
            Error::Statement(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_diagnostic() {
        let body = json!({
            "message": "Node 42 not found",
            "exception": "NodeNotFoundException",
            "stacktrace": ["a", "b"]
        });
        let d = ServerDiagnostic::from_body(Some(&body)).unwrap();
        assert_eq!(d.summary(), "Node 42 not found");
        assert_eq!(d.stacktrace.len(), 2);
    }

    #[test]
    fn test_transactional_diagnostic() {
        let body = json!({"errors": [{"code": 0, "status": "Unknown", "message": "no such tx"}]});
        let d = ServerDiagnostic::from_body(Some(&body)).unwrap();
        assert_eq!(d.summary(), "no such tx");
    }

    #[test]
    fn test_non_diagnostic_bodies() {
        assert!(ServerDiagnostic::from_body(None).is_none());
        assert!(ServerDiagnostic::from_body(Some(&json!({"results": []}))).is_none());
        assert!(ServerDiagnostic::from_body(Some(&json!([1, 2]))).is_none());
        let html = json!("<html>oops</html>");
        assert_eq!(
            ServerDiagnostic::from_body(Some(&html)).unwrap().summary(),
            "<html>oops</html>"
        );
    }

    #[test]
    fn test_protocol_error_display_and_tier() {
        let err = Error::protocol("commit", 500, Some(&json!({"message": "boom"})));
        assert_eq!(err.to_string(), "unexpected status 500 for commit: boom");
        assert_eq!(err.tier(), ErrorTier::Protocol);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.code(), "LINK_PROTOCOL_UNEXPECTED_STATUS");

        let bare = Error::protocol("rollback", 404, None);
        assert_eq!(bare.to_string(), "unexpected status 404 for rollback");
        assert_eq!(bare.code(), "LINK_PROTOCOL_NOT_FOUND");
    }

    #[test]
    fn test_transport_tier() {
        let err = Error::from(TransportError::Connect("refused".into()));
        assert_eq!(err.tier(), ErrorTier::Transport);
        assert_eq!(err.code(), "LINK_TRANSPORT_CONNECT");
        assert!(err.statement_errors().is_none());
    }

    #[test]
    fn test_bad_response_is_transport_tier() {
        let err = Error::BadResponse {
            operation: "commit",
            reason: "results is not an array".to_string(),
        };
        assert_eq!(err.tier(), ErrorTier::Transport);
        assert_eq!(err.code(), "LINK_TRANSPORT_BAD_RESPONSE");
        assert_eq!(err.status(), None);
    }
}
