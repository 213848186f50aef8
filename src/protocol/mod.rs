//! # Message Protocol
//!
//! Chunking, signing and reassembly of whole messages.
//!
//! ## Components
//! - **Message**: plaintext, fingerprint, signature and packet construction
//! - **Builder**: per-fingerprint reassembly session with first-writer-wins slots
//! - **Reassembler**: the fingerprint-to-builder table for one receiving run
//! - **Send**: one-call sign-and-chunk producing a [`send::SendBundle`]
//!
//! ## Guarantees
//! - A built message always hashes to the fingerprint its packets claimed
//! - A built message's signature has been checked against the receiver's policy
//! - One bad packet never aborts reassembly of the rest of its message

pub mod builder;
pub mod message;
pub mod reassembler;
pub mod send;

#[cfg(test)]
mod tests;
