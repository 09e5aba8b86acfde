//! Structured JSON logger
//!
//! - One log record = one event = one JSON object
//! - `event` first, `severity` second, remaining keys sorted
//! - Records are handed to the `log` facade; the application picks the sink

use std::fmt::{self, Write};

use serde_json::Value;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Wire-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Statement failures and other recoverable issues
    Warn = 2,
    /// Transport and protocol failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Matching `log` level
    pub fn level(&self) -> log::Level {
        match self {
            Severity::Trace => log::Level::Trace,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target every record is logged under
pub const LOG_TARGET: &str = "cypherlink";

/// Structured logger writing JSON records through `log`
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    ///
    /// Fields are output in deterministic order (alphabetical by key)
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let level = severity.level();
        if !log::log_enabled!(target: LOG_TARGET, level) {
            return;
        }
        log::log!(target: LOG_TARGET, level, "{}", Self::format_record(severity, event, fields));
    }

    /// Render one record as a single-line JSON object
    pub fn format_record(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        push_json_string(&mut output, event);
        output.push_str(",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push('"');

        for (key, value) in sorted_fields {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }

        output.push('}');
        output
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }
}

/// Appends `s` as a quoted, escaped JSON string
fn push_json_string(output: &mut String, s: &str) {
    // Writing to a String cannot fail.
    let _ = write!(output, "{}", Value::from(s));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(Severity::Trace.level(), log::Level::Trace);
        assert_eq!(Severity::Error.level(), log::Level::Error);
        assert_eq!(Severity::Warn.as_str(), "WARN");
    }

    #[test]
    fn test_record_json_format() {
        let output = Logger::format_record(Severity::Info, "TX_COMMIT", &[]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "TX_COMMIT");
        assert_eq!(parsed["severity"], "INFO");
    }

    #[test]
    fn test_record_deterministic_ordering() {
        let output1 = Logger::format_record(
            Severity::Info,
            "TEST",
            &[("zebra", "1"), ("apple", "2"), ("mango", "3")],
        );
        let output2 = Logger::format_record(
            Severity::Info,
            "TEST",
            &[("apple", "2"), ("mango", "3"), ("zebra", "1")],
        );
        assert_eq!(output1, output2);

        let apple_pos = output1.find("apple").unwrap();
        let zebra_pos = output1.find("zebra").unwrap();
        assert!(output1.find("\"event\"").unwrap() < output1.find("\"severity\"").unwrap());
        assert!(apple_pos < zebra_pos);
    }

    #[test]
    fn test_record_escapes_statement_text() {
        let output = Logger::format_record(
            Severity::Warn,
            "TX_STATEMENT_ERRORS",
            &[("message", "Invalid input 'f': expected \"MATCH\"\n\tline 1")],
        );
        assert!(!output.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "Invalid input 'f': expected \"MATCH\"\n\tline 1");
    }

    #[test]
    fn test_log_without_logger_is_noop() {
        Logger::info("TEST", &[("k", "v")]);
        Logger::warn("TEST", &[]);
    }
}
