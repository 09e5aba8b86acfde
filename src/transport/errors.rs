//! Transport error types
//!
//! A transport error means the HTTP exchange itself did not complete in a
//! usable way. Nothing received alongside one is trustworthy.

use thiserror::Error;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Failure of a single HTTP exchange
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport's own timeout elapsed
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Request could not be sent or the response could not be read
    #[error("request failed: {0}")]
    Request(String),

    /// Response body was not valid JSON
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Request body could not be serialized
    #[error("request body could not be serialized: {0}")]
    Serialize(String),
}

impl TransportError {
    /// Stable code string for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "LINK_TRANSPORT_CONNECT",
            TransportError::Timeout(_) => "LINK_TRANSPORT_TIMEOUT",
            TransportError::Request(_) => "LINK_TRANSPORT_REQUEST",
            TransportError::MalformedBody(_) => "LINK_TRANSPORT_MALFORMED_BODY",
            TransportError::Serialize(_) => "LINK_TRANSPORT_SERIALIZE",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_decode() {
            TransportError::MalformedBody(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            TransportError::Connect("x".into()),
            TransportError::Timeout("x".into()),
            TransportError::Request("x".into()),
            TransportError::MalformedBody("x".into()),
            TransportError::Serialize("x".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display() {
        let err = TransportError::MalformedBody("expected value at line 1".into());
        assert_eq!(
            err.to_string(),
            "malformed response body: expected value at line 1"
        );
    }
}
