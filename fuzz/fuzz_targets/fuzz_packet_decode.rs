#![no_main]

use airgap_courier::{Packet, Reassembler, Verification};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(record) = std::str::from_utf8(data) else {
        return;
    };

    // Records decode or fail cleanly; anything decoded must re-encode
    if let Ok(packet) = Packet::deserialize(record) {
        let _ = packet.serialize();
    }

    let mut run = Reassembler::new(Verification::AllowUnsigned);
    for line in record.lines() {
        let _ = run.ingest_record(line);
    }
    let _ = run.finish();
});
