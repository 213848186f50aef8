//! Session table for one receiving run.
//!
//! The [`Reassembler`] owns the mapping from fingerprint to [`Builder`]
//! exclusively. A builder is opened lazily on the first packet that claims a
//! fingerprint and fed every later packet claiming the same one. When the
//! batch is exhausted, [`Reassembler::finish`] builds every complete session
//! and reports the rest.
//!
//! The table is plain owned state, not shared: drive it from one task.
//!
//! The first packet seen for a fingerprint fixes that session's signature and
//! chunk count. A forged record that arrives first (or sorts first in a drop
//! directory) therefore makes every genuine packet of that message fail with
//! `SignatureMismatch` or `TotalChunksMismatch`, leaving the session
//! incomplete. Such sessions are logged at `warn` by [`Reassembler::finish`].

use crate::core::packet::Packet;
use crate::error::{CourierError, Result};
use crate::protocol::builder::{Admission, Builder};
use crate::protocol::message::Message;
use crate::utils::crypto::Verification;
use crate::utils::metrics::{Metrics, MetricsSnapshot};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Reassembly progress of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub fingerprint: String,
    pub received: usize,
    pub expected: usize,
}

/// Outcome of a receiving run
#[derive(Debug)]
pub struct RunReport {
    /// Messages that were complete and passed verification
    pub completed: Vec<Message>,
    /// Sessions still waiting for chunks
    pub incomplete: Vec<Progress>,
    /// Complete sessions whose build failed, keyed by fingerprint
    pub failed: Vec<(String, CourierError)>,
    pub metrics: MetricsSnapshot,
}

/// Fingerprint-keyed reassembly sessions for one batch of packets.
#[derive(Debug)]
pub struct Reassembler {
    sessions: BTreeMap<String, Builder>,
    verification: Verification,
    metrics: Metrics,
}

impl Reassembler {
    pub fn new(verification: Verification) -> Self {
        Self {
            sessions: BTreeMap::new(),
            verification,
            metrics: Metrics::new(),
        }
    }

    /// Decode a serialized record and route it to its session.
    ///
    /// # Errors
    /// Returns `CourierError::MalformedPacket` for undecodable records; the
    /// caller should skip the record. No session is touched in that case.
    pub fn ingest_record(&mut self, record: &str) -> Result<Admission> {
        self.metrics.record_seen();
        match Packet::deserialize(record) {
            Ok(packet) => Ok(self.ingest(packet)),
            Err(e) => {
                self.metrics.record_malformed();
                warn!(error = %e, "Skipping malformed record");
                Err(e)
            }
        }
    }

    /// Route a decoded packet to its session, opening one if needed
    pub fn ingest(&mut self, packet: Packet) -> Admission {
        let builder = match self.sessions.entry(packet.fingerprint().to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.metrics.session_opened();
                debug!(
                    fingerprint = %packet.fingerprint(),
                    total_chunks = packet.total_chunks(),
                    "Opening reassembly session"
                );
                entry.insert(Builder::for_packet(&packet))
            }
        };

        let admission = builder.add_packet(packet);
        self.metrics.admission(admission);
        admission
    }

    pub fn session(&self, fingerprint: &str) -> Option<&Builder> {
        self.sessions.get(fingerprint)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Progress of every open session, in fingerprint order
    pub fn pending(&self) -> Vec<Progress> {
        self.sessions
            .values()
            .map(|builder| Progress {
                fingerprint: builder.fingerprint().to_string(),
                received: builder.received(),
                expected: builder.total_chunks() as usize,
            })
            .collect()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Build every complete session and close the run
    #[instrument(skip(self), fields(sessions = self.sessions.len()))]
    pub fn finish(self) -> RunReport {
        let Self {
            sessions,
            verification,
            metrics,
        } = self;

        let mut completed = Vec::new();
        let mut incomplete = Vec::new();
        let mut failed = Vec::new();

        for (fingerprint, mut builder) in sessions {
            if !builder.is_complete() {
                let rejected = builder.rejections().total();
                if rejected > 0 {
                    warn!(
                        fingerprint = %fingerprint,
                        received = builder.received(),
                        rejected,
                        "Incomplete session discarded packets; its first packet may be forged"
                    );
                }
                info!(
                    fingerprint = %fingerprint,
                    received = builder.received(),
                    expected = builder.total_chunks(),
                    "Skipping message because not all packets have been received"
                );
                metrics.message_incomplete();
                incomplete.push(Progress {
                    fingerprint,
                    received: builder.received(),
                    expected: builder.total_chunks() as usize,
                });
                continue;
            }

            match builder.build(&verification) {
                Ok(message) => {
                    metrics.message_built();
                    completed.push(message);
                }
                Err(e) => {
                    match e {
                        CourierError::IntegrityError { .. } => metrics.integrity_failure(),
                        CourierError::AuthenticityError(_) => metrics.authenticity_failure(),
                        _ => {}
                    }
                    warn!(fingerprint = %fingerprint, error = %e, "Failed to build message");
                    failed.push((fingerprint, e));
                }
            }
        }

        metrics.log_metrics();

        RunReport {
            completed,
            incomplete,
            failed,
            metrics: metrics.snapshot(),
        }
    }
}
