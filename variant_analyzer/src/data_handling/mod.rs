use polars::prelude::*;

use crate::error::Result;
use crate::models::{FUNC_INT, LOF};

pub mod brca1;
pub mod labeled_csv;

pub use brca1::Brca1Dataset;
pub use labeled_csv::LabeledCsvDataset;

/// Canonical column names of a labelled variant table.
pub const CHROM: &str = "chrom";
pub const POS: &str = "pos";
pub const REF: &str = "ref";
pub const ALT: &str = "alt";
pub const SCORE: &str = "score";
pub const CLASS: &str = "class";
pub const DELTA: &str = "evo2_delta_score";

/// A source of labelled variants with columns
/// `chrom, pos (Int64, 1-indexed), ref, alt, score (Float64), class`.
pub trait Dataset {
    fn load(&self) -> Result<DataFrame>;
}

/// Functional classes reduced to the two labels calibration works with.
pub fn collapse_class(raw: &str) -> String {
    match raw.trim() {
        "FUNC" | "INT" | FUNC_INT => FUNC_INT.to_string(),
        "LOF" => LOF.to_string(),
        other => other.to_string(),
    }
}
