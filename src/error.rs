//! # Error Types
//!
//! Error handling for the courier protocol.
//!
//! This module defines every failure a send or receive run can report, from
//! undecodable packet records up to reassembled messages that fail their
//! integrity or authenticity checks.
//!
//! ## Error Categories
//! - **Codec Errors**: records that are not valid packets (`MalformedPacket`)
//! - **Sender Misuse**: `NotSigned`, `AlreadySigned`, `PacketTooSmall`
//! - **Reassembly**: `IncompleteMessage` (retryable), `SessionClosed`
//! - **Verification**: `IntegrityError` (corrupted data) and
//!   `AuthenticityError` (wrong key or forged signature)
//! - **Ambient**: I/O, key material and configuration failures
//!
//! Per-packet rejections inside a builder are *not* errors; they are reported
//! as [`Admission`](crate::protocol::builder::Admission) values so that one bad
//! packet never aborts a multi-packet message.
//!
//! ## Example Usage
//! ```rust
//! use airgap_courier::error::{CourierError, Result};
//! use airgap_courier::Packet;
//! use tracing::{info, warn};
//!
//! fn decode(record: &str) -> Result<Packet> {
//!     Packet::deserialize(record)
//! }
//!
//! match decode("not json") {
//!     Ok(packet) => info!(index = packet.chunk_index(), "Decoded packet"),
//!     Err(CourierError::MalformedPacket(reason)) => warn!(%reason, "Skipping record"),
//!     Err(e) => warn!(error = %e, "Unexpected failure"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Verification failures
    pub const ERR_SIGNATURE_INVALID: &str = "Signature does not verify against the fingerprint";
    pub const ERR_SIGNATURE_ENCODING: &str = "Signature is not valid hex";
    pub const ERR_SIGNATURE_REQUIRED: &str = "Message is unsigned but a signature is required";
    pub const ERR_UNVERIFIABLE_SIGNATURE: &str =
        "Message is signed but no verification key is configured";

    /// Key material errors
    pub const ERR_KEY_LENGTH: &str = "Key must be exactly 32 bytes";
    pub const ERR_KEY_ENCODING: &str = "Key file is not valid hex";
    pub const ERR_KEY_ENTROPY: &str = "Failed to gather entropy for key generation";
    pub const ERR_FINGERPRINT_ENCODING: &str = "Fingerprint is not valid hex";
}

// CourierError is the primary error type for all courier operations
#[derive(Error, Debug)]
pub enum CourierError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Message must be signed (or explicitly marked unsigned) before constructing packets")]
    NotSigned,

    #[error("Message signature has already been set")]
    AlreadySigned,

    #[error(
        "Packet size {max_packet_size} is too small: per-packet overhead is {overhead} bytes"
    )]
    PacketTooSmall {
        max_packet_size: usize,
        overhead: usize,
    },

    #[error("Incomplete message: {received} of {expected} chunks received")]
    IncompleteMessage { received: usize, expected: usize },

    #[error(
        "Actual and expected fingerprints differ.\nMessage: {plaintext}\nExpected fingerprint: {expected}\nActual fingerprint: {actual}"
    )]
    IntegrityError {
        expected: String,
        actual: String,
        plaintext: String,
    },

    #[error("Authenticity check failed: {0}")]
    AuthenticityError(String),

    #[error("Reassembly session already produced its message")]
    SessionClosed,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using CourierError
pub type Result<T> = std::result::Result<T, CourierError>;
