//! # airgap-courier
//!
//! Move a text message across an air-gapped or unreliable channel (printed or
//! scanned QR codes, files dropped in a watched directory) by splitting it
//! into small self-describing packets and reassembling it on the far side
//! with integrity and authenticity checks.
//!
//! ## Flow
//! ```text
//! sender:   Message::from_text -> sign -> construct_packets -> Packet::serialize -> medium
//! receiver: medium -> Reassembler::ingest_record -> Builder (per fingerprint) -> build
//! ```
//!
//! ## Guarantees
//! - Packets may arrive in any order, duplicated, or mixed with packets of
//!   other messages
//! - The first packet accepted for a chunk index is kept; later ones are ignored
//! - A message is only handed out after its SHA-256 fingerprint and its
//!   Ed25519 signature both check out
//!
//! ## Example
//! ```rust
//! use airgap_courier::{Message, Reassembler, SenderKey, Verification};
//!
//! # fn main() -> airgap_courier::Result<()> {
//! let key = SenderKey::generate()?;
//!
//! let mut message = Message::from_text("meet at the north gate");
//! message.sign(&key)?;
//! let records = message
//!     .construct_packets(400)?
//!     .iter()
//!     .map(|p| p.serialize())
//!     .collect::<airgap_courier::Result<Vec<_>>>()?;
//!
//! let mut run = Reassembler::new(Verification::required(key.receiver_key()));
//! for record in records.iter().rev() {
//!     run.ingest_record(record)?;
//! }
//! let report = run.finish();
//! assert_eq!(report.completed[0].text(), "meet at the north gate");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::packet::{Packet, Signature};
pub use crate::error::{CourierError, Result};
pub use crate::protocol::builder::{Admission, Builder, Rejection};
pub use crate::protocol::message::Message;
pub use crate::protocol::reassembler::{Progress, Reassembler, RunReport};
pub use crate::utils::crypto::{
    MessageSigner, ReceiverKey, SenderKey, SignatureVerifier, Verification,
};
