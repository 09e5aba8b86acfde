//! Client metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - One registry per `Database`, shared by its transactions and batches

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one `Database`
///
/// # Thread Safety
///
/// All counters use atomic operations with Relaxed ordering.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Statements sent in any request
    statements_sent: AtomicU64,
    /// Statement-level errors reported by the server
    statement_errors: AtomicU64,
    /// Transactions the server opened
    transactions_opened: AtomicU64,
    /// Transactions committed
    transactions_committed: AtomicU64,
    /// Transactions rolled back
    transactions_rolled_back: AtomicU64,
    /// Transactions found expired
    transactions_expired: AtomicU64,
    /// Batches executed
    batches_executed: AtomicU64,
    /// Jobs sent in batches
    batch_jobs_sent: AtomicU64,
    /// Failed HTTP exchanges
    transport_failures: AtomicU64,
    /// Unexpected status codes
    protocol_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Statement metrics

    /// Add statements sent
    pub fn add_statements_sent(&self, count: u64) {
        self.statements_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Add statement errors
    pub fn add_statement_errors(&self, count: u64) {
        self.statement_errors.fetch_add(count, Ordering::Relaxed);
    }

    // Transaction metrics

    /// Increment transactions opened
    pub fn increment_transactions_opened(&self) {
        self.transactions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment transactions committed
    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment transactions rolled back
    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment transactions expired
    pub fn increment_transactions_expired(&self) {
        self.transactions_expired.fetch_add(1, Ordering::Relaxed);
    }

    // Batch metrics

    /// Record one executed batch of `jobs` jobs
    pub fn record_batch(&self, jobs: u64) {
        self.batches_executed.fetch_add(1, Ordering::Relaxed);
        self.batch_jobs_sent.fetch_add(jobs, Ordering::Relaxed);
    }

    // Failure metrics

    /// Increment transport failures
    pub fn increment_transport_failures(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment protocol failures
    pub fn increment_protocol_failures(&self) {
        self.protocol_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            statements_sent: self.statements_sent.load(Ordering::Relaxed),
            statement_errors: self.statement_errors.load(Ordering::Relaxed),
            transactions_opened: self.transactions_opened.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            transactions_expired: self.transactions_expired.load(Ordering::Relaxed),
            batches_executed: self.batches_executed.load(Ordering::Relaxed),
            batch_jobs_sent: self.batch_jobs_sent.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            protocol_failures: self.protocol_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub statements_sent: u64,
    pub statement_errors: u64,
    pub transactions_opened: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
    pub transactions_expired: u64,
    pub batches_executed: u64,
    pub batch_jobs_sent: u64,
    pub transport_failures: u64,
    pub protocol_failures: u64,
}
