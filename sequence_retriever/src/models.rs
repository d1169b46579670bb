// src/models.rs

use serde::{Deserialize, Serialize};

/// A contiguous, uppercased slice of a reference genome.
///
/// `start` is 0-indexed and inclusive; the window ends at `start + len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicWindow {
    pub chromosome: String,
    pub genome_build: String,
    pub start: u64,
    pub sequence: String,
}

impl GenomicWindow {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Exclusive 0-indexed end of the bases actually held.
    pub fn end(&self) -> u64 {
        self.start + self.len() as u64
    }

    /// Zero-based offset of a 1-indexed genomic position, if it falls inside the window.
    pub fn offset_of(&self, position: u64) -> Option<usize> {
        let zero_based = position.checked_sub(1)?;
        let offset = zero_based.checked_sub(self.start)? as usize;
        (offset < self.len()).then_some(offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeAssembly {
    pub id: String,
    pub name: String,
    pub source_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    pub name: String,
    pub size: u64,
}
