//! Observability for receiving runs
//!
//! Counts what happened to every record a run looked at: decoded or
//! malformed, accepted into a session or discarded, and how each session
//! ended. Discards are never raised as errors, so these counters are the
//! audit trail for them.
//!
//! Counters are atomics so recording only needs `&self`; a run's
//! `Reassembler` owns its `Metrics` exclusively, and the final values are
//! handed out as a [`MetricsSnapshot`] in the run report.

use crate::protocol::builder::{Admission, Rejection};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for one receiving run
#[derive(Debug)]
pub struct Metrics {
    /// Serialized records offered to the run
    pub records_total: AtomicU64,
    /// Records the codec could not decode
    pub records_malformed: AtomicU64,
    /// Packets stored in an empty slot
    pub packets_accepted: AtomicU64,
    /// Packets dropped because their slot was already filled
    pub packets_duplicate: AtomicU64,
    /// Packets whose fingerprint did not match the session
    pub rejected_fingerprint: AtomicU64,
    /// Packets whose signature did not match the session
    pub rejected_signature: AtomicU64,
    /// Packets whose chunk count did not match the session
    pub rejected_total_chunks: AtomicU64,
    /// Packets with an out-of-range chunk index
    pub rejected_index: AtomicU64,
    /// Packets offered to an already built session
    pub rejected_closed: AtomicU64,
    /// Sessions opened
    pub sessions_opened: AtomicU64,
    /// Messages successfully built
    pub messages_built: AtomicU64,
    /// Sessions still missing chunks at the end of the run
    pub messages_incomplete: AtomicU64,
    /// Builds that failed the fingerprint check
    pub integrity_failures: AtomicU64,
    /// Builds that failed the signature check
    pub authenticity_failures: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            records_total: AtomicU64::new(0),
            records_malformed: AtomicU64::new(0),
            packets_accepted: AtomicU64::new(0),
            packets_duplicate: AtomicU64::new(0),
            rejected_fingerprint: AtomicU64::new(0),
            rejected_signature: AtomicU64::new(0),
            rejected_total_chunks: AtomicU64::new(0),
            rejected_index: AtomicU64::new(0),
            rejected_closed: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            messages_built: AtomicU64::new(0),
            messages_incomplete: AtomicU64::new(0),
            integrity_failures: AtomicU64::new(0),
            authenticity_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a serialized record being offered
    pub fn record_seen(&self) {
        self.records_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record the codec rejected
    pub fn record_malformed(&self) {
        self.records_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a builder treated a packet
    pub fn admission(&self, admission: Admission) {
        let counter = match admission {
            Admission::Accepted => &self.packets_accepted,
            Admission::Duplicate => &self.packets_duplicate,
            Admission::Rejected(Rejection::FingerprintMismatch) => &self.rejected_fingerprint,
            Admission::Rejected(Rejection::SignatureMismatch) => &self.rejected_signature,
            Admission::Rejected(Rejection::TotalChunksMismatch) => &self.rejected_total_chunks,
            Admission::Rejected(Rejection::IndexOutOfRange) => &self.rejected_index,
            Admission::Rejected(Rejection::SessionClosed) => &self.rejected_closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_built(&self) {
        self.messages_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_incomplete(&self) {
        self.messages_incomplete.fetch_add(1, Ordering::Relaxed);
    }

    pub fn integrity_failure(&self) {
        self.integrity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn authenticity_failure(&self) {
        self.authenticity_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_total: self.records_total.load(Ordering::Relaxed),
            records_malformed: self.records_malformed.load(Ordering::Relaxed),
            packets_accepted: self.packets_accepted.load(Ordering::Relaxed),
            packets_duplicate: self.packets_duplicate.load(Ordering::Relaxed),
            rejected_fingerprint: self.rejected_fingerprint.load(Ordering::Relaxed),
            rejected_signature: self.rejected_signature.load(Ordering::Relaxed),
            rejected_total_chunks: self.rejected_total_chunks.load(Ordering::Relaxed),
            rejected_index: self.rejected_index.load(Ordering::Relaxed),
            rejected_closed: self.rejected_closed.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            messages_built: self.messages_built.load(Ordering::Relaxed),
            messages_incomplete: self.messages_incomplete.load(Ordering::Relaxed),
            integrity_failures: self.integrity_failures.load(Ordering::Relaxed),
            authenticity_failures: self.authenticity_failures.load(Ordering::Relaxed),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            records_total = snapshot.records_total,
            records_malformed = snapshot.records_malformed,
            packets_accepted = snapshot.packets_accepted,
            packets_duplicate = snapshot.packets_duplicate,
            packets_rejected = snapshot.packets_rejected(),
            sessions_opened = snapshot.sessions_opened,
            messages_built = snapshot.messages_built,
            messages_incomplete = snapshot.messages_incomplete,
            integrity_failures = snapshot.integrity_failures,
            authenticity_failures = snapshot.authenticity_failures,
            elapsed_ms = snapshot.elapsed_ms,
            "Receive run metrics"
        );
        debug!(
            rejected_fingerprint = snapshot.rejected_fingerprint,
            rejected_signature = snapshot.rejected_signature,
            rejected_total_chunks = snapshot.rejected_total_chunks,
            rejected_index = snapshot.rejected_index,
            rejected_closed = snapshot.rejected_closed,
            "Packet rejection breakdown"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_total: u64,
    pub records_malformed: u64,
    pub packets_accepted: u64,
    pub packets_duplicate: u64,
    pub rejected_fingerprint: u64,
    pub rejected_signature: u64,
    pub rejected_total_chunks: u64,
    pub rejected_index: u64,
    pub rejected_closed: u64,
    pub sessions_opened: u64,
    pub messages_built: u64,
    pub messages_incomplete: u64,
    pub integrity_failures: u64,
    pub authenticity_failures: u64,
    pub elapsed_ms: u64,
}

impl MetricsSnapshot {
    /// All discarded packets, duplicates excluded
    pub fn packets_rejected(&self) -> u64 {
        self.rejected_fingerprint
            + self.rejected_signature
            + self.rejected_total_chunks
            + self.rejected_index
            + self.rejected_closed
    }
}
