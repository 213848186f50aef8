//! Drop-directory transport.
//!
//! The sender writes one file per packet into a directory; whatever carries
//! files across the gap (removable media, a synced share, a scanner that
//! saves decoded QR text) delivers them to the receiver's inbox. The receiver
//! reads every file with the expected extension, reassembles what it can and
//! writes each completed message to a file named by its fingerprint.
//!
//! File names are `<fingerprint>_<chunk_index>.txt`. Only the file contents
//! matter to the receiver; names are for humans.

use crate::config::DEFAULT_PACKET_EXTENSION;
use crate::core::packet::Packet;
use crate::error::Result;
use crate::protocol::message::Message;
use crate::protocol::reassembler::{Reassembler, RunReport};
use crate::utils::crypto::Verification;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// One packet file read from an inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRecord {
    pub path: PathBuf,
    pub contents: String,
}

/// File name used for a packet in an outbox
pub fn packet_file_name(packet: &Packet) -> String {
    format!(
        "{}_{}.{DEFAULT_PACKET_EXTENSION}",
        packet.fingerprint(),
        packet.chunk_index()
    )
}

/// Write every packet to its own file in `dir`, creating `dir` if needed
#[instrument(skip(packets), fields(dir = %dir.display(), packets = packets.len()))]
pub async fn write_packets(dir: &Path, packets: &[Packet]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).await?;

    let mut paths = Vec::with_capacity(packets.len());
    for packet in packets {
        let path = dir.join(packet_file_name(packet));
        fs::write(&path, packet.serialize()?).await?;
        debug!(path = %path.display(), "Wrote packet file");
        paths.push(path);
    }

    Ok(paths)
}

/// Read every file in `dir` whose extension is `extension`.
///
/// Files with other extensions and files that cannot be read as text are
/// skipped and logged. Records are returned sorted by path.
#[instrument(fields(dir = %dir.display()))]
pub async fn read_records(dir: &Path, extension: &str) -> Result<Vec<DropRecord>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut records = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            debug!(path = %path.display(), "Skipping file with other extension");
            continue;
        }

        match fs::read_to_string(&path).await {
            Ok(contents) => records.push(DropRecord { path, contents }),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not read packet file"),
        }
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}

/// Write a reassembled message to `<dir>/<fingerprint>`
pub async fn write_message(dir: &Path, message: &Message) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(message.fingerprint());
    fs::write(&path, message.text()).await?;
    Ok(path)
}

/// One receiving run over an inbox directory.
///
/// Reads every packet file, reassembles complete messages under
/// `verification` and writes each completed message into `output_dir`.
/// Malformed files are skipped; incomplete and failed messages are reported
/// in the returned [`RunReport`].
#[instrument(skip(verification), fields(inbox = %inbox.display(), output = %output_dir.display()))]
pub async fn receive_from_dir(
    inbox: &Path,
    extension: &str,
    output_dir: &Path,
    verification: Verification,
) -> Result<RunReport> {
    let records = read_records(inbox, extension).await?;
    info!(files = records.len(), "Looking for complete messages");

    let mut run = Reassembler::new(verification);
    for record in &records {
        if run.ingest_record(&record.contents).is_err() {
            debug!(path = %record.path.display(), "Skipped file with malformed contents");
        }
    }

    let report = run.finish();
    for message in &report.completed {
        let path = write_message(output_dir, message).await?;
        info!(
            fingerprint = %message.fingerprint(),
            path = %path.display(),
            "Wrote message"
        );
    }

    Ok(report)
}
