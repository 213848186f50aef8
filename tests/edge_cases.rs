#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for reassembly runs
//! Tests malformed input, interleaved sessions, boundary budgets and hostile packets

use airgap_courier::error::CourierError;
use airgap_courier::protocol::builder::{Admission, Builder, BuilderState, Rejection};
use airgap_courier::protocol::message::Message;
use airgap_courier::protocol::reassembler::{Progress, Reassembler};
use airgap_courier::utils::crypto::{SenderKey, Verification};
use airgap_courier::{Packet, Signature};

fn key() -> SenderKey {
    SenderKey::from_seed([0x5Au8; 32])
}

fn verification() -> Verification {
    Verification::required(key().receiver_key())
}

fn signed(text: &str) -> Message {
    let mut message = Message::from_text(text);
    message.sign(&key()).expect("sign");
    message
}

fn records(message: &Message, budget: usize) -> Vec<String> {
    message
        .construct_packets(budget)
        .expect("packets")
        .iter()
        .map(|p| p.serialize().expect("serialize"))
        .collect()
}

// ============================================================================
// RECORD DECODING
// ============================================================================

#[test]
fn test_malformed_records_are_skipped_and_counted() {
    let message = signed("HELLOWORLD");
    let mut run = Reassembler::new(verification());

    for junk in ["", "not json", "{}", "[1,2,3]", "{\"fingerprint\":\"ab\"}"] {
        assert!(matches!(
            run.ingest_record(junk),
            Err(CourierError::MalformedPacket(_))
        ));
    }
    assert_eq!(run.session_count(), 0);

    for record in records(&message, 1000) {
        assert_eq!(run.ingest_record(&record).unwrap(), Admission::Accepted);
    }

    let report = run.finish();
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.metrics.records_total, 6);
    assert_eq!(report.metrics.records_malformed, 5);
    assert_eq!(report.metrics.packets_accepted, 1);
    assert_eq!(report.metrics.messages_built, 1);
}

#[test]
fn test_record_with_index_out_of_range_is_malformed() {
    let message = signed("HELLOWORLD");
    let packets = message.construct_packets(1000).unwrap();
    let record = packets[0]
        .serialize()
        .unwrap()
        .replace("\"chunk_index\":0", "\"chunk_index\":7");

    let mut run = Reassembler::new(verification());
    assert!(run.ingest_record(&record).is_err());
    assert_eq!(run.session_count(), 0);
}

#[test]
fn test_record_with_extra_field_is_malformed() {
    let message = signed("HELLOWORLD");
    let record = message.construct_packets(1000).unwrap()[0]
        .serialize()
        .unwrap();
    let tampered = format!("{},\"extra\":1}}", record.trim_end_matches('}'));

    assert!(matches!(
        Packet::deserialize(&tampered),
        Err(CourierError::MalformedPacket(_))
    ));
}

#[test]
fn test_record_claiming_maximum_chunk_count() {
    let record =
        r#"{"fingerprint":"ab","total_chunks":4294967295,"chunk_index":0,"chunk_data":""}"#;

    let mut run = Reassembler::new(Verification::AllowUnsigned);
    assert_eq!(run.ingest_record(record).unwrap(), Admission::Accepted);
    assert_eq!(
        run.pending(),
        vec![Progress {
            fingerprint: "ab".to_string(),
            received: 1,
            expected: u32::MAX as usize,
        }]
    );

    let report = run.finish();
    assert!(report.completed.is_empty());
    assert_eq!(report.incomplete.len(), 1);
}

// ============================================================================
// SESSIONS
// ============================================================================

#[test]
fn test_interleaved_sessions_complete_independently() {
    let first = signed("the first message travels in several small chunks");
    let second = signed("a second one, interleaved with the first");
    let budget = first.packet_overhead().unwrap() + 8;

    let a = records(&first, budget);
    let b = records(&second, budget);
    assert!(a.len() > 1 && b.len() > 1);

    // second message in order, first message reversed, alternating
    let mut run = Reassembler::new(verification());
    let mut forward = b.iter();
    let mut backward = a.iter().rev();
    loop {
        let next = [forward.next(), backward.next()];
        if next.iter().all(Option::is_none) {
            break;
        }
        for record in next.into_iter().flatten() {
            run.ingest_record(record).unwrap();
        }
    }
    assert_eq!(run.session_count(), 2);

    let report = run.finish();
    assert!(report.failed.is_empty());
    assert!(report.incomplete.is_empty());

    let mut texts: Vec<&str> = report.completed.iter().map(|m| m.text()).collect();
    texts.sort_unstable();
    assert_eq!(
        texts,
        vec![
            "a second one, interleaved with the first",
            "the first message travels in several small chunks"
        ]
    );
    assert_eq!(report.metrics.sessions_opened, 2);
}

#[test]
fn test_pending_reports_progress() {
    let message = signed("0123456789abcdefghij");
    let budget = message.packet_overhead().unwrap() + 5;
    let all = records(&message, budget);
    assert_eq!(all.len(), 4);

    let mut run = Reassembler::new(verification());
    run.ingest_record(&all[3]).unwrap();
    run.ingest_record(&all[1]).unwrap();
    run.ingest_record(&all[1]).unwrap();

    assert_eq!(
        run.pending(),
        vec![Progress {
            fingerprint: message.fingerprint().to_string(),
            received: 2,
            expected: 4,
        }]
    );

    let report = run.finish();
    assert!(report.completed.is_empty());
    assert_eq!(report.incomplete.len(), 1);
    assert_eq!(report.metrics.packets_duplicate, 1);
    assert_eq!(report.metrics.messages_incomplete, 1);
}

#[test]
fn test_forged_first_writer_fails_integrity() {
    let message = signed("HELLOWORLD");
    let budget = message.packet_overhead().unwrap() + 5;
    let packets = message.construct_packets(budget).unwrap();
    assert_eq!(packets.len(), 2);

    let forged = Packet::new(
        packets[0].fingerprint(),
        packets[0].signature().clone(),
        2,
        0,
        "EVIL!",
    );

    let mut run = Reassembler::new(verification());
    assert_eq!(run.ingest(forged), Admission::Accepted);
    assert_eq!(run.ingest(packets[0].clone()), Admission::Duplicate);
    assert_eq!(run.ingest(packets[1].clone()), Admission::Accepted);

    let report = run.finish();
    assert!(report.completed.is_empty());
    assert_eq!(report.failed.len(), 1);
    match &report.failed[0].1 {
        CourierError::IntegrityError {
            expected,
            plaintext,
            ..
        } => {
            assert_eq!(expected, message.fingerprint());
            assert_eq!(plaintext, "EVIL!WORLD");
        }
        other => panic!("Unexpected error: {other:?}"),
    }
    assert_eq!(report.metrics.integrity_failures, 1);
}

#[test]
fn test_forged_first_signature_locks_out_genuine_packets() {
    let message = signed("HELLOWORLD");
    let budget = message.packet_overhead().unwrap() + 5;
    let packets = message.construct_packets(budget).unwrap();

    let forged = Packet::new(
        message.fingerprint(),
        Signature::Signed("00".repeat(64)),
        2,
        0,
        "HELLO",
    );

    let mut run = Reassembler::new(verification());
    assert_eq!(run.ingest(forged), Admission::Accepted);
    for packet in packets {
        assert_eq!(
            run.ingest(packet),
            Admission::Rejected(Rejection::SignatureMismatch)
        );
    }
    assert_eq!(
        run.session(message.fingerprint()).unwrap().rejections().total(),
        2
    );

    let report = run.finish();
    assert!(report.completed.is_empty());
    assert_eq!(report.incomplete[0].received, 1);
    assert_eq!(report.metrics.rejected_signature, 2);
}

#[test]
fn test_conflicting_signature_is_rejected_by_session() {
    let message = signed("HELLOWORLD");
    let packet = message.construct_packets(1000).unwrap().remove(0);

    let mut builder = Builder::for_packet(&packet);
    let resigned = Packet::new(
        packet.fingerprint(),
        Signature::Signed("00".repeat(64)),
        packet.total_chunks(),
        packet.chunk_index(),
        packet.chunk_data(),
    );
    let recounted = Packet::new(
        packet.fingerprint(),
        packet.signature().clone(),
        packet.total_chunks() + 1,
        packet.chunk_index(),
        packet.chunk_data(),
    );

    assert_eq!(
        builder.add_packet(resigned),
        Admission::Rejected(Rejection::SignatureMismatch)
    );
    assert_eq!(
        builder.add_packet(recounted),
        Admission::Rejected(Rejection::TotalChunksMismatch)
    );
    assert_eq!(builder.received(), 0);
    assert_eq!(builder.rejections().total(), 2);

    assert_eq!(builder.add_packet(packet), Admission::Accepted);
    assert!(builder.build(&verification()).is_ok());
    assert_eq!(builder.state(), BuilderState::Built);
}

#[test]
fn test_unsigned_message_fails_required_verification() {
    let mut message = Message::from_text("no signature here");
    message.mark_unsigned().unwrap();

    let mut run = Reassembler::new(verification());
    for record in records(&message, 500) {
        run.ingest_record(&record).unwrap();
    }

    let report = run.finish();
    assert!(report.completed.is_empty());
    assert!(matches!(
        report.failed[0].1,
        CourierError::AuthenticityError(_)
    ));
    assert_eq!(report.metrics.authenticity_failures, 1);
}

// ============================================================================
// BOUNDARIES
// ============================================================================

#[test]
fn test_empty_message_round_trip() {
    let message = signed("");
    let all = records(&message, 1000);
    assert_eq!(all.len(), 1);

    let mut run = Reassembler::new(verification());
    run.ingest_record(&all[0]).unwrap();

    let report = run.finish();
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].text(), "");
    assert_eq!(report.completed[0].fingerprint(), message.fingerprint());
}

#[test]
fn test_large_multilingual_message_round_trip() {
    let text = "Grüße aus Zürich, 東京からこんにちは, \"quoted\"\n\ttabbed 🚀 "
        .repeat(200);
    let message = signed(&text);
    let budget = 400;
    let all = records(&message, budget);
    assert!(all.len() > 50);
    assert!(all.iter().all(|r| r.len() <= budget));

    let mut run = Reassembler::new(verification());
    for record in all.iter().rev() {
        run.ingest_record(record).unwrap();
    }

    let report = run.finish();
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].text(), text);
}

#[test]
fn test_budget_at_overhead_is_too_small() {
    let message = signed("HELLOWORLD");
    let overhead = message.packet_overhead().unwrap();

    assert!(matches!(
        message.construct_packets(overhead),
        Err(CourierError::PacketTooSmall { .. })
    ));
    assert_eq!(message.construct_packets(overhead + 1).unwrap().len(), 10);
}

#[test]
fn test_escaped_character_larger_than_chunk_is_too_small() {
    let message = signed("\u{1}");
    let overhead = message.packet_overhead().unwrap();

    // "\u0001" needs six bytes inside a JSON string
    assert!(matches!(
        message.construct_packets(overhead + 5),
        Err(CourierError::PacketTooSmall { .. })
    ));
    assert_eq!(message.construct_packets(overhead + 6).unwrap().len(), 1);
}
