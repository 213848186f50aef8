//! # Utility Modules
//!
//! Supporting utilities for cryptography, logging and observability.
//!
//! ## Components
//! - **Crypto**: SHA-256 fingerprints, Ed25519 sender/receiver keys, and the
//!   receiver's verification policy
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Counters for every record, packet and session of a run
//!
//! ## Security
//! - Key generation draws from the OS CSPRNG (getrandom)
//! - Secret seed copies are wiped after use (zeroize crate)

pub mod crypto;
pub mod logging;
pub mod metrics;

// Re-export public types for advanced users
pub use crypto::{MessageSigner, ReceiverKey, SenderKey, SignatureVerifier, Verification};
pub use metrics::{Metrics, MetricsSnapshot};
