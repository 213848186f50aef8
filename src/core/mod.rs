//! # Core Wire Components
//!
//! The packet record and its textual codec.
//!
//! Every chunk of a message travels as one self-describing JSON record that
//! names the message it belongs to (by fingerprint), the sender's signature,
//! and its position in the chunk sequence.
//!
//! ## Wire Format
//! ```text
//! {"fingerprint":str,"signature":str?,"total_chunks":u32,"chunk_index":u32,"chunk_data":str}
//! ```
//!
//! ## Validation
//! - `total_chunks` must be positive
//! - `chunk_index` must lie in `[0, total_chunks)`
//! - unknown fields are rejected; field names are case-sensitive

pub mod packet;
