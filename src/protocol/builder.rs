//! Per-message reassembly session.
//!
//! A [`Builder`] is created for one fingerprint and collects that message's
//! packets into slots keyed by `chunk_index`. Slots are only materialized as
//! packets arrive, so the memory a session holds is bounded by what was
//! actually received, never by the `total_chunks` a record claims. Packets
//! that do not belong (wrong fingerprint, signature or chunk count, index out
//! of range) are discarded and counted; they never abort the session. Slots
//! are first-writer-wins: once filled, a slot is never replaced.
//!
//! ```text
//!   Accumulating --build() ok--> Built
//!        ^   |
//!        +---+ build() err
//! ```

use crate::core::packet::{Packet, Signature};
use crate::error::{CourierError, Result};
use crate::protocol::message::Message;
use crate::utils::crypto::{self, Verification};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Why a packet was discarded by a builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    FingerprintMismatch,
    SignatureMismatch,
    TotalChunksMismatch,
    IndexOutOfRange,
    /// The session already produced its message
    SessionClosed,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::FingerprintMismatch => "fingerprint mismatch",
            Rejection::SignatureMismatch => "signature mismatch",
            Rejection::TotalChunksMismatch => "total_chunks mismatch",
            Rejection::IndexOutOfRange => "chunk_index out of range",
            Rejection::SessionClosed => "session closed",
        }
    }
}

/// Outcome of offering a packet to a builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored in a previously empty slot
    Accepted,
    /// Slot already filled; the new packet was dropped
    Duplicate,
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Accumulating,
    Built,
}

/// Discard counters for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub fingerprint_mismatch: u64,
    pub signature_mismatch: u64,
    pub total_chunks_mismatch: u64,
    pub index_out_of_range: u64,
    pub session_closed: u64,
    pub duplicates: u64,
}

impl RejectionCounts {
    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::FingerprintMismatch => self.fingerprint_mismatch += 1,
            Rejection::SignatureMismatch => self.signature_mismatch += 1,
            Rejection::TotalChunksMismatch => self.total_chunks_mismatch += 1,
            Rejection::IndexOutOfRange => self.index_out_of_range += 1,
            Rejection::SessionClosed => self.session_closed += 1,
        }
    }

    /// Rejected packets, not counting duplicates
    pub fn total(&self) -> u64 {
        self.fingerprint_mismatch
            + self.signature_mismatch
            + self.total_chunks_mismatch
            + self.index_out_of_range
            + self.session_closed
    }
}

/// Reassembly session for a single fingerprint.
#[derive(Debug)]
pub struct Builder {
    fingerprint: String,
    signature: Signature,
    total_chunks: u32,
    slots: BTreeMap<u32, Packet>,
    state: BuilderState,
    rejections: RejectionCounts,
}

impl Builder {
    pub fn new(fingerprint: impl Into<String>, signature: Signature, total_chunks: u32) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            signature,
            total_chunks,
            slots: BTreeMap::new(),
            state: BuilderState::Accumulating,
            rejections: RejectionCounts::default(),
        }
    }

    /// Session whose expectations are taken from the first packet seen
    pub fn for_packet(packet: &Packet) -> Self {
        Self::new(
            packet.fingerprint(),
            packet.signature().clone(),
            packet.total_chunks(),
        )
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    /// Number of filled slots
    pub fn received(&self) -> usize {
        self.slots.len()
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn rejections(&self) -> &RejectionCounts {
        &self.rejections
    }

    /// Offer a packet to this session.
    ///
    /// Never fails: packets that do not belong are discarded and counted.
    pub fn add_packet(&mut self, packet: Packet) -> Admission {
        let index = packet.chunk_index();

        let rejection = if self.state == BuilderState::Built {
            Some(Rejection::SessionClosed)
        } else if packet.fingerprint() != self.fingerprint {
            Some(Rejection::FingerprintMismatch)
        } else if packet.signature() != &self.signature {
            Some(Rejection::SignatureMismatch)
        } else if packet.total_chunks() != self.total_chunks {
            Some(Rejection::TotalChunksMismatch)
        } else if index >= self.total_chunks {
            Some(Rejection::IndexOutOfRange)
        } else {
            None
        };

        if let Some(rejection) = rejection {
            self.rejections.record(rejection);
            warn!(
                fingerprint = %self.fingerprint,
                chunk_index = index,
                reason = rejection.as_str(),
                "Discarding packet"
            );
            return Admission::Rejected(rejection);
        }

        match self.slots.entry(index) {
            Entry::Occupied(_) => {
                self.rejections.duplicates += 1;
                debug!(fingerprint = %self.fingerprint, chunk_index = index, "Duplicate packet ignored");
                Admission::Duplicate
            }
            Entry::Vacant(slot) => {
                slot.insert(packet);
                Admission::Accepted
            }
        }
    }

    /// True once every slot holds a packet
    pub fn is_complete(&self) -> bool {
        // only in-range indices are ever inserted
        self.slots.len() == self.total_chunks as usize
    }

    /// Reconstruct and verify the message.
    ///
    /// The fingerprint of the reassembled text is checked first, then the
    /// signature under `verification`. Nothing is returned unless both pass.
    ///
    /// # Errors
    /// - `IncompleteMessage` while slots are missing (retryable)
    /// - `IntegrityError` if the reassembled text hashes differently
    /// - `AuthenticityError` if the signature is rejected by `verification`
    /// - `SessionClosed` if this session already built its message
    #[instrument(skip(self, verification), fields(fingerprint = %self.fingerprint))]
    pub fn build(&mut self, verification: &Verification) -> Result<Message> {
        if self.state == BuilderState::Built {
            return Err(CourierError::SessionClosed);
        }

        if !self.is_complete() {
            return Err(CourierError::IncompleteMessage {
                received: self.slots.len(),
                expected: self.total_chunks as usize,
            });
        }

        let text: String = self
            .slots
            .values()
            .map(Packet::chunk_data)
            .collect();

        let actual = crypto::fingerprint(&text);
        if actual != self.fingerprint {
            warn!(actual = %actual, "Reassembled message failed integrity check");
            return Err(CourierError::IntegrityError {
                expected: self.fingerprint.clone(),
                actual,
                plaintext: text,
            });
        }

        verification.check(&self.fingerprint, &self.signature)?;

        self.state = BuilderState::Built;
        info!(chunks = self.total_chunks, "Message reassembled");

        Ok(Message::verified(
            text,
            self.fingerprint.clone(),
            self.signature.clone(),
        ))
    }
}
