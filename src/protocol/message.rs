//! Whole-message handling on the sending side.
//!
//! A [`Message`] owns its plaintext and the plaintext's fingerprint. Before
//! it can be broken into packets the sender must decide on authenticity:
//! either [`Message::sign`] with a private key or an explicit
//! [`Message::mark_unsigned`]. There is no silent unsigned fallback.

use crate::core::packet::{encoded_char_len, Packet, Signature};
use crate::error::{CourierError, Result};
use crate::utils::crypto::{self, MessageSigner};
use tracing::{debug, instrument};

/// A complete text message and its authenticity state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    fingerprint: String,
    signature: Option<Signature>,
}

impl Message {
    /// Wrap `text` and derive its fingerprint
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = crypto::fingerprint(&text);
        Self {
            text,
            fingerprint,
            signature: None,
        }
    }

    /// Message as reassembled and verified by a builder
    pub(crate) fn verified(text: String, fingerprint: String, signature: Signature) -> Self {
        Self {
            text,
            fingerprint,
            signature: Some(signature),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Hex SHA-256 of the plaintext
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `None` until the message is signed or marked unsigned
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Sign the fingerprint with the sender's key.
    ///
    /// # Errors
    /// Returns `CourierError::AlreadySigned` if a signature decision was
    /// already made, or any error raised by the signer.
    pub fn sign(&mut self, signer: &dyn MessageSigner) -> Result<()> {
        if self.signature.is_some() {
            return Err(CourierError::AlreadySigned);
        }
        self.signature = Some(crypto::sign_fingerprint(signer, &self.fingerprint)?);
        debug!(fingerprint = %self.fingerprint, "Message signed");
        Ok(())
    }

    /// Opt in to unsigned transmission
    pub fn mark_unsigned(&mut self) -> Result<()> {
        if self.signature.is_some() {
            return Err(CourierError::AlreadySigned);
        }
        self.signature = Some(Signature::Unsigned);
        Ok(())
    }

    /// Bytes every packet of this message spends on everything but chunk data.
    ///
    /// # Errors
    /// Returns `CourierError::NotSigned` before a signature decision is made.
    pub fn packet_overhead(&self) -> Result<usize> {
        let signature = self.signature.as_ref().ok_or(CourierError::NotSigned)?;
        Ok(Packet::record_overhead(signature)?
            + self.fingerprint.len()
            + signature.encoded_len())
    }

    /// Split the plaintext into packets whose serialized form fits in
    /// `max_packet_size` bytes.
    ///
    /// An empty plaintext produces a single packet with empty chunk data.
    ///
    /// # Errors
    /// - `CourierError::NotSigned` if neither `sign` nor `mark_unsigned` ran
    /// - `CourierError::PacketTooSmall` if the budget cannot hold the record
    ///   overhead plus at least one character
    #[instrument(skip(self), fields(fingerprint = %self.fingerprint))]
    pub fn construct_packets(&self, max_packet_size: usize) -> Result<Vec<Packet>> {
        let signature = self.signature.as_ref().ok_or(CourierError::NotSigned)?;
        let overhead = self.packet_overhead()?;
        let too_small = || CourierError::PacketTooSmall {
            max_packet_size,
            overhead,
        };

        let chunk_size = max_packet_size
            .checked_sub(overhead)
            .filter(|size| *size > 0)
            .ok_or_else(too_small)?;

        debug!(max_packet_size, chunk_size, "Breaking message into packets");

        let chunks = split_encoded(&self.text, chunk_size).ok_or_else(too_small)?;
        let total_chunks = u32::try_from(chunks.len()).map_err(|_| too_small())?;

        Ok(chunks
            .into_iter()
            .zip(0..total_chunks)
            .map(|(chunk, index)| {
                Packet::new(
                    self.fingerprint.clone(),
                    signature.clone(),
                    total_chunks,
                    index,
                    chunk,
                )
            })
            .collect())
    }
}

/// Split `text` left to right into slices whose JSON-encoded size is at most
/// `budget` bytes. Returns `None` if a single character does not fit.
fn split_encoded(text: &str, budget: usize) -> Option<Vec<&str>> {
    if text.is_empty() {
        return Some(vec![""]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut used = 0;

    for (pos, c) in text.char_indices() {
        let len = encoded_char_len(c);
        if len > budget {
            return None;
        }
        if used + len > budget {
            chunks.push(&text[start..pos]);
            start = pos;
            used = 0;
        }
        used += len;
    }
    chunks.push(&text[start..]);

    Some(chunks)
}
