//! Archive bundling.
//!
//! Bundles the ordered chunk artifacts of a multi-file export into one
//! Deflate-compressed archive, preserving entry order and batch-numbered
//! filenames, and records the aggregate compression accounting. The
//! archive buffer is subject to the same container-signature gate as the
//! workbooks it contains.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::{Artifact, ArchiveStats};
use crate::error::{ExportError, ExportResult};
use crate::writer::{ZIP_MIME, validate_container};

/// Bundles `entries` into a single compressed archive artifact.
///
/// Entry names match the suggested filenames of the inputs; ordering
/// matches input order. The total record count of the archive is the sum
/// over its entries.
pub fn bundle(entries: &[Artifact], archive_filename: String) -> ExportResult<(Artifact, ArchiveStats)> {
    if entries.is_empty() {
        return Err(ExportError::Internal(
            "cannot archive an empty artifact list".to_string(),
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut uncompressed_total = 0u64;
    let mut record_count = 0u64;
    for entry in entries {
        writer
            .start_file(entry.suggested_filename.clone(), options)
            .map_err(|e| ExportError::Internal(format!("archive entry failed: {}", e)))?;
        writer
            .write_all(&entry.bytes)
            .map_err(|e| ExportError::Internal(format!("archive write failed: {}", e)))?;
        uncompressed_total += entry.len();
        record_count += entry.record_count;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ExportError::Internal(format!("archive finalization failed: {}", e)))?;
    let bytes = cursor.into_inner();
    validate_container(&bytes)?;

    let compressed_total = bytes.len() as u64;
    let stats = ArchiveStats {
        uncompressed_total,
        compressed_total,
        compression_ratio: if uncompressed_total == 0 {
            1.0
        } else {
            compressed_total as f64 / uncompressed_total as f64
        },
    };

    let artifact = Artifact {
        bytes,
        mime_type: ZIP_MIME,
        suggested_filename: archive_filename,
        uncompressed_size: uncompressed_total,
        record_count,
    };
    Ok((artifact, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::CONTAINER_SIGNATURE;
    use std::io::Read;

    fn chunk(name: &str, payload: &[u8], records: u64) -> Artifact {
        Artifact {
            bytes: payload.to_vec(),
            mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            suggested_filename: name.to_string(),
            uncompressed_size: payload.len() as u64,
            record_count: records,
        }
    }

    #[test]
    fn archive_preserves_entry_order_and_contents() {
        let a = chunk("batch_1_of_2.xlsx", &[1u8; 4096], 10);
        let b = chunk("batch_2_of_2.xlsx", &[2u8; 2048], 5);
        let (artifact, stats) = bundle(&[a.clone(), b.clone()], "all.zip".to_string()).unwrap();

        assert_eq!(&artifact.bytes[..2], &CONTAINER_SIGNATURE);
        assert_eq!(artifact.record_count, 15);
        assert_eq!(stats.uncompressed_total, 6144);
        assert!(stats.compressed_total < stats.uncompressed_total);

        // Extraction yields byte-for-byte equal entries, in input order.
        let mut archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        for (index, original) in [a, b].iter().enumerate() {
            let mut entry = archive.by_index(index).unwrap();
            assert_eq!(entry.name(), original.suggested_filename);
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            assert_eq!(contents, original.bytes);
        }
    }

    #[test]
    fn compression_ratio_is_fractional() {
        let a = chunk("a.xlsx", &[0u8; 100_000], 1);
        let (_, stats) = bundle(&[a], "a.zip".to_string()).unwrap();
        assert!(stats.compression_ratio > 0.0);
        assert!(stats.compression_ratio < 1.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(bundle(&[], "none.zip".to_string()).is_err());
    }
}
