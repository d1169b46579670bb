// src/reference.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use tracing::info;

use crate::error::{Result, SequenceError};

/// A single reference chromosome held in memory, uppercased.
pub struct ReferenceSequence {
    pub id: String,
    pub sequence: String,
}

/// A batch-flow window plus the variant's offset inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWindow<'a> {
    pub start: usize,
    pub sequence: &'a str,
    pub offset: usize,
}

impl ReferenceSequence {
    /// Reads the first record of a FASTA file, gunzipping when the name ends in `.gz`.
    pub fn from_fasta(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let record = fasta::Reader::new(reader)
            .records()
            .next()
            .ok_or_else(|| SequenceError::Fasta(format!("no records in {}", path.display())))?
            .map_err(|e| SequenceError::Fasta(e.to_string()))?;

        let seq = record.seq();
        if let Some(i) = seq.iter().position(|b| !b.is_ascii()) {
            return Err(SequenceError::Fasta(format!(
                "non-ASCII byte 0x{:02x} at offset {} of {}",
                seq[i],
                i,
                record.id()
            )));
        }
        let sequence = String::from_utf8_lossy(seq).to_ascii_uppercase();
        info!("Loaded reference {} ({} bases)", record.id(), sequence.len());

        Ok(Self {
            id: record.id().to_string(),
            sequence,
        })
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// `[p - W/2, p + W/2)` around the 1-indexed `position`, clipped to the chromosome.
    ///
    /// Returns `None` when the position lies beyond the end of the sequence.
    pub fn window_around(&self, position: u64, window_size: usize) -> Option<ReferenceWindow<'_>> {
        let p = usize::try_from(position.checked_sub(1)?).ok()?;
        if p >= self.len() {
            return None;
        }
        let half = window_size / 2;
        let start = p.saturating_sub(half);
        let end = (p + half).min(self.len());
        Some(ReferenceWindow {
            start,
            sequence: &self.sequence[start..end],
            offset: half.min(p),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn reference(seq: &str) -> ReferenceSequence {
        ReferenceSequence {
            id: "chr17".into(),
            sequence: seq.into(),
        }
    }

    #[test]
    fn reads_first_record_from_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chr17.fna.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b">NC_000017.10 chr17\nacgtn\nACGT\n>second\nTTTT\n").unwrap();
        enc.finish().unwrap();

        let reference = ReferenceSequence::from_fasta(&path).unwrap();
        assert_eq!(reference.id, "NC_000017.10");
        assert_eq!(reference.sequence, "ACGTNACGT");
    }

    #[test]
    fn empty_fasta_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fa");
        File::create(&path).unwrap();
        assert!(matches!(
            ReferenceSequence::from_fasta(&path),
            Err(SequenceError::Fasta(_))
        ));
    }

    #[test]
    fn non_ascii_bases_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chr17.fa");
        std::fs::write(&path, b">chr17\nACGT\xc3\xa9ACGT\n").unwrap();
        assert!(matches!(
            ReferenceSequence::from_fasta(&path),
            Err(SequenceError::Fasta(_))
        ));
    }

    #[test]
    fn window_offsets_near_edges() {
        let r = reference("AACCGGTTAACCGGTT");
        let w = r.window_around(8, 4).unwrap();
        assert_eq!((w.start, w.sequence, w.offset), (5, "GTTA", 2));

        let w = r.window_around(1, 4).unwrap();
        assert_eq!((w.start, w.sequence, w.offset), (0, "AA", 0));

        let w = r.window_around(16, 4).unwrap();
        assert_eq!((w.start, w.sequence, w.offset), (13, "GTT", 2));

        assert!(r.window_around(17, 4).is_none());
        assert!(r.window_around(0, 4).is_none());
    }
}
