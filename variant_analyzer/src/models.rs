// src/models.rs

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

pub const LOF: &str = "LOF";
pub const FUNC_INT: &str = "FUNC/INT";

/// Largest accepted 1-indexed position; labelled tables store positions as `i64`.
pub const MAX_POSITION: u64 = i64::MAX as u64;

/// A single-nucleotide variant as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// 1-indexed genomic position.
    pub position: u64,
    /// Filled in from the fetched window once it is known.
    #[serde(default)]
    pub reference_allele: Option<char>,
    pub alternate_allele: char,
    pub chromosome: String,
    pub genome_build: String,
}

impl Variant {
    pub fn new(
        position: u64,
        alternate: &str,
        chromosome: &str,
        genome_build: &str,
    ) -> Result<Self, AnalyzerError> {
        if position == 0 {
            return Err(AnalyzerError::InvalidVariant(
                "variant_position is 1-indexed and must be at least 1".into(),
            ));
        }
        if position > MAX_POSITION {
            return Err(AnalyzerError::InvalidVariant(format!(
                "variant_position must be at most {MAX_POSITION}, got {position}"
            )));
        }
        if chromosome.trim().is_empty() || genome_build.trim().is_empty() {
            return Err(AnalyzerError::InvalidVariant(
                "chromosome and genome must both be given".into(),
            ));
        }
        Ok(Self {
            position,
            reference_allele: None,
            alternate_allele: parse_base(alternate)?,
            chromosome: chromosome.trim().to_string(),
            genome_build: genome_build.trim().to_string(),
        })
    }
}

/// Validates a single-base allele and uppercases it.
pub fn parse_base(allele: &str) -> Result<char, AnalyzerError> {
    let mut chars = allele.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if matches!(c.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'T' | 'N') => {
            Ok(c.to_ascii_uppercase())
        }
        _ => Err(AnalyzerError::InvalidVariant(format!(
            "alternative allele must be a single base (A, C, G, T or N), got {allele:?}"
        ))),
    }
}

fn compact_notation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<genome>[A-Za-z0-9]+):)?(?P<chrom>[A-Za-z0-9_.]+):(?P<pos>[0-9,]+):(?:(?P<ref>[ACGTNacgtn])>)?(?P<alt>[A-Za-z])$")
            .expect("static regex")
    })
}

/// Compact notation `[genome:]chrom:position:[ref>]alt`, e.g. `hg38:chr17:43119628:G`.
///
/// Without a genome prefix the build defaults to `hg38`. A reference base given
/// here is informational only; the fetched window is authoritative.
impl FromStr for Variant {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = compact_notation().captures(s.trim()).ok_or_else(|| {
            AnalyzerError::InvalidVariant(format!(
                "expected [genome:]chrom:position:[ref>]alt, got {s:?}"
            ))
        })?;
        let position = caps["pos"]
            .replace(',', "")
            .parse::<u64>()
            .map_err(|e| AnalyzerError::InvalidVariant(e.to_string()))?;
        let genome = caps.name("genome").map_or("hg38", |m| m.as_str());
        let mut variant = Variant::new(position, &caps["alt"], &caps["chrom"], genome)?;
        variant.reference_allele = caps
            .name("ref")
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase());
        Ok(variant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    #[serde(rename = "Likely pathogenic")]
    LikelyPathogenic,
    #[serde(rename = "Likely benign")]
    LikelyBenign,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Prediction::LikelyPathogenic => "Likely pathogenic",
            Prediction::LikelyBenign => "Likely benign",
        };
        write!(f, "{s}")
    }
}

/// Outcome of scoring one variant against its reference window.
///
/// `classification_confidence` is `|delta - threshold| / std` clipped at 1.0:
/// a distance in class standard deviations, not a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub reference: char,
    pub alternative: char,
    pub delta_score: f64,
    pub prediction: Prediction,
    pub classification_confidence: f64,
}

/// Response body of the single-variant endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantReport {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub position: u64,
}

/// Decision threshold on the delta score and the per-class delta spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub threshold: f64,
    pub lof_std: f64,
    #[serde(alias = "func_int_std")]
    pub func_std: f64,
}

impl CalibrationParams {
    /// Threshold must be finite and both spreads finite and strictly positive.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if !self.threshold.is_finite() {
            return Err(AnalyzerError::Calibration(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        for (class, std) in [(LOF, self.lof_std), (FUNC_INT, self.func_std)] {
            if std == 0.0 {
                return Err(AnalyzerError::DivideByZero { class });
            }
            if !(std.is_finite() && std > 0.0) {
                return Err(AnalyzerError::Calibration(format!(
                    "{class} standard deviation must be finite and positive, got {std}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CalibrationParams {
    /// Derived once from the first 500 BRCA1 saturation-mutagenesis variants.
    fn default() -> Self {
        Self {
            threshold: -0.0009178519,
            lof_std: 0.0015140239,
            func_std: 0.0009016589,
        }
    }
}
