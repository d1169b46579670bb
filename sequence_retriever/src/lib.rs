//! Outbound sequence plumbing: the UCSC REST client, variant-centred window
//! fetching, assembly/chromosome listings and local FASTA references.

pub mod api_handler;
pub mod error;
pub mod genome_window;
pub mod genomes;
pub mod models;
pub mod reference;

pub use api_handler::UCSC_API_URL;
pub use error::{Result, SequenceError};
pub use genome_window::{SequenceSource, UcscClient, WindowBounds, DEFAULT_WINDOW_SIZE};
pub use genomes::GenomesByOrganism;
pub use models::{Chromosome, GenomeAssembly, GenomicWindow};
pub use reference::{ReferenceSequence, ReferenceWindow};
