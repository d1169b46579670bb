// src/genome_window.rs

use serde_json::Value;
use tracing::{info, warn};

use crate::api_handler::ApiHandler;
use crate::error::{Result, SequenceError};
use crate::models::GenomicWindow;

pub const DEFAULT_WINDOW_SIZE: u64 = 8192;

/// Half-open, 0-indexed coordinates requested from the sequence service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: u64,
    pub end: u64,
}

impl WindowBounds {
    /// Window of `window_size / 2` bases either side of a 1-indexed `position`.
    ///
    /// The variant base itself is included on top of both halves, so an odd
    /// `window_size` yields exactly `window_size` bases and an even one yields
    /// one extra. Near the chromosome start the window is clipped at 0.
    /// `None` when the end does not fit in a `u64`.
    pub fn around(position: u64, window_size: u64) -> Option<Self> {
        let half = window_size / 2;
        let zero_based = position.saturating_sub(1);
        Some(Self {
            start: zero_based.saturating_sub(half),
            end: zero_based.checked_add(half)?.checked_add(1)?,
        })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Anything that can hand back a reference window around a variant.
pub trait SequenceSource {
    fn fetch_window(
        &self,
        chromosome: &str,
        genome: &str,
        position: u64,
        window_size: u64,
    ) -> Result<GenomicWindow>;
}

/// Client for the public UCSC Genome Browser REST API.
pub struct UcscClient {
    pub(crate) api: ApiHandler,
}

impl UcscClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            api: ApiHandler::new(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    pub fn fetch_genome_window(
        &self,
        chromosome: &str,
        genome: &str,
        position: u64,
        window_size: u64,
    ) -> Result<GenomicWindow> {
        let bounds = WindowBounds::around(position, window_size).ok_or(
            SequenceError::Coordinates {
                position,
                window_size,
            },
        )?;

        info!(
            "Fetching {}bp window around position {} from UCSC API",
            window_size, position
        );
        info!("Coordinates: {}:{}-{} ({})", chromosome, bounds.start, bounds.end, genome);

        let body = self.api.get_json(
            "/getData/sequence",
            &[
                ("genome", genome.to_string()),
                ("chrom", chromosome.to_string()),
                ("start", bounds.start.to_string()),
                ("end", bounds.end.to_string()),
            ],
        )?;

        let sequence = body
            .get("dna")
            .and_then(Value::as_str)
            .ok_or_else(|| SequenceError::from_payload(&body))?
            .to_ascii_uppercase();

        let expected = bounds.len();
        if sequence.len() as u64 != expected {
            warn!(
                "Received sequence length ({}) differs from expected ({})",
                sequence.len(),
                expected
            );
        }
        info!("Loaded reference window (length: {} bases)", sequence.len());

        Ok(GenomicWindow {
            chromosome: chromosome.to_string(),
            genome_build: genome.to_string(),
            start: bounds.start,
            sequence,
        })
    }
}

impl SequenceSource for UcscClient {
    fn fetch_window(
        &self,
        chromosome: &str,
        genome: &str,
        position: u64,
        window_size: u64,
    ) -> Result<GenomicWindow> {
        self.fetch_genome_window(chromosome, genome, position, window_size)
    }
}
