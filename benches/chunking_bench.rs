use airgap_courier::{Message, Packet, Reassembler, SenderKey, Verification};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

#[allow(clippy::unwrap_used)]
fn bench_construct_packets(c: &mut Criterion) {
    let mut group = c.benchmark_group("construct_packets");
    let key = SenderKey::from_seed([7u8; 32]);
    let sizes = [64usize, 1024, 16 * 1024, 256 * 1024];

    for &size in &sizes {
        let mut message = Message::from_text("x".repeat(size));
        message.sign(&key).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("chunk_{size}b"), |b| {
            b.iter(|| {
                let packets = message.construct_packets(1000).unwrap();
                assert!(!packets.is_empty());
            })
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");
    let key = SenderKey::from_seed([7u8; 32]);

    for &size in &[1024usize, 64 * 1024] {
        let mut message = Message::from_text("y".repeat(size));
        message.sign(&key).unwrap();
        let records: Vec<String> = message
            .construct_packets(1000)
            .unwrap()
            .iter()
            .rev()
            .map(|p| p.serialize().unwrap())
            .collect();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("records_{size}b"), |b| {
            b.iter_batched(
                || Reassembler::new(Verification::required(key.receiver_key())),
                |mut run| {
                    for record in &records {
                        run.ingest_record(record).unwrap();
                    }
                    let report = run.finish();
                    assert_eq!(report.completed.len(), 1);
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_packet_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_codec");
    let key = SenderKey::from_seed([7u8; 32]);
    let mut message = Message::from_text("z".repeat(700));
    message.sign(&key).unwrap();
    let packet = message.construct_packets(1000).unwrap().remove(0);
    let record = packet.serialize().unwrap();

    group.bench_function("serialize", |b| {
        b.iter(|| packet.serialize().unwrap())
    });
    group.bench_function("deserialize", |b| {
        b.iter(|| Packet::deserialize(&record).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_construct_packets,
    bench_reassemble,
    bench_packet_codec
);
criterion_main!(benches);
