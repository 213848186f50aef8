//! Sending side in one call.
//!
//! [`prepare_send`] turns a text into everything a transport needs: the
//! message fingerprint, its signature and the ordered serialized packets.
//! The [`SendBundle`] serializes to the JSON shape a web front end can hand
//! straight to a QR renderer.

use crate::core::packet::Packet;
use crate::error::Result;
use crate::protocol::message::Message;
use crate::utils::crypto::MessageSigner;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Packets of one message, ready for a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBundle {
    pub fingerprint: String,
    /// Hex signature, absent for unsigned sends
    pub signature: Option<String>,
    pub serialized_packets: Vec<String>,
}

/// Build, sign and chunk `text`.
///
/// Pass `None` as `signer` for an explicitly unsigned send. Either all
/// packets are produced or none are.
pub fn prepare_send(
    text: &str,
    signer: Option<&dyn MessageSigner>,
    max_packet_size: usize,
) -> Result<(Message, Vec<Packet>, SendBundle)> {
    let mut message = Message::from_text(text);
    match signer {
        Some(signer) => message.sign(signer)?,
        None => message.mark_unsigned()?,
    }

    let packets = message.construct_packets(max_packet_size)?;
    let serialized_packets = packets
        .iter()
        .map(Packet::serialize)
        .collect::<Result<Vec<_>>>()?;

    info!(
        fingerprint = %message.fingerprint(),
        packets = packets.len(),
        max_packet_size,
        "Prepared message for sending"
    );

    let bundle = SendBundle {
        fingerprint: message.fingerprint().to_string(),
        signature: message
            .signature()
            .and_then(|sig| sig.as_str())
            .map(str::to_string),
        serialized_packets,
    };

    Ok((message, packets, bundle))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::utils::crypto::SenderKey;

    #[test]
    fn test_bundle_matches_packets() {
        let key = SenderKey::from_seed([5u8; 32]);
        let (message, packets, bundle) = prepare_send("HELLOWORLD", Some(&key), 400).unwrap();

        assert_eq!(bundle.fingerprint, message.fingerprint());
        assert!(bundle.signature.is_some());
        assert_eq!(bundle.serialized_packets.len(), packets.len());
        assert_eq!(
            Packet::deserialize(&bundle.serialized_packets[0]).unwrap(),
            packets[0]
        );
    }

    #[test]
    fn test_unsigned_bundle_has_null_signature() {
        let (_, _, bundle) = prepare_send("hi", None, 400).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json["signature"].is_null());
    }

    #[test]
    fn test_too_small_budget_produces_nothing() {
        assert!(prepare_send("HELLOWORLD", None, 10).is_err());
    }
}
