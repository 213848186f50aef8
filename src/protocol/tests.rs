// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::packet::{Packet, Signature};
use crate::error::CourierError;
use crate::protocol::builder::{Admission, Builder, Rejection};
use crate::protocol::message::Message;
use crate::protocol::reassembler::Reassembler;
use crate::utils::crypto::{SenderKey, Verification};

const PLAINTEXT: &str = "HELLOWORLD";

fn sender_a() -> SenderKey {
    SenderKey::from_seed([0xA1; 32])
}

fn sender_b() -> SenderKey {
    SenderKey::from_seed([0xB2; 32])
}

/// Signed packets of `PLAINTEXT` cut into 3-character chunks
fn signed_packets(key: &SenderKey) -> Vec<Packet> {
    let mut message = Message::from_text(PLAINTEXT);
    message.sign(key).unwrap();
    let budget = message.packet_overhead().unwrap() + 3;
    message.construct_packets(budget).unwrap()
}

fn builder_for(packets: &[Packet]) -> Builder {
    Builder::for_packet(&packets[0])
}

#[test]
fn test_chunks_follow_budget() {
    let packets = signed_packets(&sender_a());
    let chunks: Vec<&str> = packets.iter().map(Packet::chunk_data).collect();

    assert_eq!(chunks, vec!["HEL", "LOW", "ORL", "D"]);
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet.total_chunks(), 4);
        assert_eq!(packet.chunk_index() as usize, i);
    }
}

#[test]
fn test_out_of_order_reassembly() {
    let key = sender_a();
    let packets = signed_packets(&key);
    let mut builder = builder_for(&packets);

    for index in [2, 0, 3, 1] {
        assert_eq!(builder.add_packet(packets[index].clone()), Admission::Accepted);
    }

    assert!(builder.is_complete());
    let message = builder
        .build(&Verification::required(key.receiver_key()))
        .expect("complete message should build");
    assert_eq!(message.text(), PLAINTEXT);
    assert_eq!(message.fingerprint(), packets[0].fingerprint());
    assert_eq!(message.signature(), Some(packets[0].signature()));
}

#[test]
fn test_missing_chunk_is_incomplete() {
    let key = sender_a();
    let packets = signed_packets(&key);
    let mut builder = builder_for(&packets);

    for index in [2, 0, 1] {
        builder.add_packet(packets[index].clone());
    }

    assert!(!builder.is_complete());
    match builder.build(&Verification::required(key.receiver_key())) {
        Err(CourierError::IncompleteMessage { received, expected }) => {
            assert_eq!(received, 3);
            assert_eq!(expected, 4);
        }
        other => panic!("expected incomplete message, got {other:?}"),
    }

    // Still accumulating: the late chunk completes it
    builder.add_packet(packets[3].clone());
    assert!(builder
        .build(&Verification::required(key.receiver_key()))
        .is_ok());
}

#[test]
fn test_foreign_fingerprint_discarded() {
    let key = sender_a();
    let packets = signed_packets(&key);
    let mut builder = builder_for(&packets);

    let spoofed = Packet::new("deadbeef", packets[0].signature().clone(), 4, 0, "XXX");
    assert_eq!(
        builder.add_packet(spoofed),
        Admission::Rejected(Rejection::FingerprintMismatch)
    );
    assert_eq!(builder.received(), 0);

    for packet in &packets {
        builder.add_packet(packet.clone());
    }
    let message = builder
        .build(&Verification::required(key.receiver_key()))
        .unwrap();
    assert_eq!(message.text(), PLAINTEXT);
}

#[test]
fn test_foreign_fingerprint_opens_separate_session() {
    let key = sender_a();
    let packets = signed_packets(&key);
    let mut run = Reassembler::new(Verification::required(key.receiver_key()));

    run.ingest(Packet::new("deadbeef", packets[0].signature().clone(), 4, 0, "XXX"));
    for packet in packets {
        run.ingest(packet);
    }

    let report = run.finish();
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].text(), PLAINTEXT);
    assert_eq!(report.incomplete.len(), 1);
    assert_eq!(report.incomplete[0].fingerprint, "deadbeef");
}

#[test]
fn test_first_writer_wins() {
    let key = sender_a();
    let packets = signed_packets(&key);
    let mut builder = builder_for(&packets);

    assert_eq!(builder.add_packet(packets[0].clone()), Admission::Accepted);
    let imposter = Packet::new(
        packets[0].fingerprint(),
        packets[0].signature().clone(),
        4,
        0,
        "XXX",
    );
    assert_eq!(builder.add_packet(imposter), Admission::Duplicate);

    for packet in &packets[1..] {
        builder.add_packet(packet.clone());
    }
    let message = builder
        .build(&Verification::required(key.receiver_key()))
        .unwrap();
    assert_eq!(message.text(), PLAINTEXT);
}

#[test]
fn test_budget_below_overhead_is_rejected() {
    let mut message = Message::from_text(PLAINTEXT);
    message.sign(&sender_a()).unwrap();
    let overhead = message.packet_overhead().unwrap();

    for budget in [0, 10, overhead - 1, overhead] {
        match message.construct_packets(budget) {
            Err(CourierError::PacketTooSmall {
                max_packet_size,
                overhead: reported,
            }) => {
                assert_eq!(max_packet_size, budget);
                assert_eq!(reported, overhead);
            }
            other => panic!("budget {budget}: expected PacketTooSmall, got {other:?}"),
        }
    }
}

#[test]
fn test_wrong_public_key_fails_authenticity() {
    let packets = signed_packets(&sender_a());
    let mut builder = builder_for(&packets);
    for packet in packets {
        builder.add_packet(packet);
    }

    let result = builder.build(&Verification::required(sender_b().receiver_key()));
    match result {
        Err(err @ CourierError::AuthenticityError(_)) => {
            assert!(!err.to_string().contains(PLAINTEXT));
        }
        other => panic!("expected authenticity error, got {other:?}"),
    }
}

#[test]
fn test_forged_first_writer_fails_integrity() {
    let key = sender_a();
    let packets = signed_packets(&key);
    let forged = Packet::new(
        packets[1].fingerprint(),
        packets[1].signature().clone(),
        4,
        1,
        "XXX",
    );

    let mut builder = builder_for(&packets);
    builder.add_packet(forged);
    for packet in &packets {
        builder.add_packet(packet.clone());
    }

    assert!(matches!(
        builder.build(&Verification::required(key.receiver_key())),
        Err(CourierError::IntegrityError { .. })
    ));
}

#[test]
fn test_unsigned_round_trip_requires_explicit_policy() {
    let mut message = Message::from_text(PLAINTEXT);
    message.mark_unsigned().unwrap();
    let packets = message.construct_packets(200).unwrap();
    assert!(packets.iter().all(|p| p.signature() == &Signature::Unsigned));

    let mut strict = builder_for(&packets);
    let mut open = builder_for(&packets);
    for packet in &packets {
        strict.add_packet(packet.clone());
        open.add_packet(packet.clone());
    }

    assert!(matches!(
        strict.build(&Verification::required(sender_a().receiver_key())),
        Err(CourierError::AuthenticityError(_))
    ));
    assert_eq!(
        open.build(&Verification::AllowUnsigned).unwrap().text(),
        PLAINTEXT
    );
}
