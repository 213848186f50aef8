//! Wire record for a single chunk of a message.
//!
//! A packet is self-describing: it carries the fingerprint of the whole
//! message it belongs to, the sender's signature over that fingerprint, its
//! position in the chunk sequence and the chunk text itself. The textual form
//! is a flat, compact JSON object:
//!
//! ```text
//! {"fingerprint":"<hex>","signature":"<hex>","total_chunks":4,"chunk_index":0,"chunk_data":"HEL"}
//! ```
//!
//! The `signature` key is omitted for unsigned packets. On decode a missing
//! or `null` signature both mean [`Signature::Unsigned`].

use crate::error::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticity token carried by every packet of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Explicitly unsigned operation; no authenticity guarantee.
    Unsigned,
    /// Hex-encoded signature over the message fingerprint.
    Signed(String),
}

impl Signature {
    pub fn is_signed(&self) -> bool {
        matches!(self, Signature::Signed(_))
    }

    /// Signature text as embedded in the wire record, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Signature::Unsigned => None,
            Signature::Signed(sig) => Some(sig),
        }
    }

    /// Number of bytes the signature text adds to every record
    pub fn encoded_len(&self) -> usize {
        self.as_str().map_or(0, str::len)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Unsigned => f.write_str("<unsigned>"),
            Signature::Signed(sig) => f.write_str(sig),
        }
    }
}

/// One independently transmittable chunk of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    fingerprint: String,
    signature: Signature,
    total_chunks: u32,
    chunk_index: u32,
    chunk_data: String,
}

#[derive(Serialize)]
struct WireRecordRef<'a> {
    fingerprint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a str>,
    total_chunks: u32,
    chunk_index: u32,
    chunk_data: &'a str,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRecord {
    fingerprint: String,
    #[serde(default)]
    signature: Option<String>,
    total_chunks: u32,
    chunk_index: u32,
    chunk_data: String,
}

impl Packet {
    /// Create a packet without range validation.
    ///
    /// Packets received from the wire go through [`Packet::deserialize`],
    /// which does validate; builders additionally discard out-of-range
    /// packets regardless of where they came from.
    pub fn new(
        fingerprint: impl Into<String>,
        signature: Signature,
        total_chunks: u32,
        chunk_index: u32,
        chunk_data: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            signature,
            total_chunks,
            chunk_index,
            chunk_data: chunk_data.into(),
        }
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

    pub fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    pub fn chunk_data(&self) -> &str {
        &self.chunk_data
    }

    /// Encode this packet as a compact JSON record
    pub fn serialize(&self) -> Result<String> {
        let record = WireRecordRef {
            fingerprint: &self.fingerprint,
            signature: self.signature.as_str(),
            total_chunks: self.total_chunks,
            chunk_index: self.chunk_index,
            chunk_data: &self.chunk_data,
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Decode a record produced by [`Packet::serialize`].
    ///
    /// # Errors
    /// Returns `CourierError::MalformedPacket` for invalid JSON, missing or
    /// unknown fields, a zero chunk count or an index outside
    /// `[0, total_chunks)`.
    pub fn deserialize(record: &str) -> Result<Self> {
        let wire: WireRecord = serde_json::from_str(record)
            .map_err(|e| CourierError::MalformedPacket(e.to_string()))?;

        if wire.total_chunks == 0 {
            return Err(CourierError::MalformedPacket(
                "total_chunks must be positive".to_string(),
            ));
        }

        if wire.chunk_index >= wire.total_chunks {
            return Err(CourierError::MalformedPacket(format!(
                "chunk_index {} out of range for {} chunks",
                wire.chunk_index, wire.total_chunks
            )));
        }

        let signature = match wire.signature {
            Some(sig) => Signature::Signed(sig),
            None => Signature::Unsigned,
        };

        Ok(Self {
            fingerprint: wire.fingerprint,
            signature,
            total_chunks: wire.total_chunks,
            chunk_index: wire.chunk_index,
            chunk_data: wire.chunk_data,
        })
    }

    /// Encoded size of a record with an empty fingerprint, empty chunk data
    /// and maximum-width counters.
    ///
    /// The signature key is only counted when `signature` is signed; the
    /// signature text itself is not included.
    pub fn record_overhead(signature: &Signature) -> Result<usize> {
        let record = WireRecordRef {
            fingerprint: "",
            signature: signature.as_str().map(|_| ""),
            total_chunks: u32::MAX,
            chunk_index: u32::MAX,
            chunk_data: "",
        };
        Ok(serde_json::to_string(&record)?.len())
    }
}

/// Number of bytes `c` occupies inside a JSON string literal.
pub(crate) fn encoded_char_len(c: char) -> usize {
    match c {
        '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}
