//! Observability for the client
//!
//! - Structured logging (JSON records through the `log` facade)
//! - Typed lifecycle events
//! - Per-database counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use cypherlink::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::TxCommit, &[("location", location)]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_TARGET};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
