//! Online path: one variant in, one classified report out.

use sequence_retriever::SequenceSource;
use tracing::{debug, info};

use crate::classification::{classify, prepare};
use crate::error::Result;
use crate::models::{CalibrationParams, Variant, VariantReport};
use crate::prediction_tools::scorer::check_scores;
use crate::prediction_tools::LikelihoodScorer;

pub struct VariantAnalyzer<'a> {
    pub source: &'a dyn SequenceSource,
    pub scorer: &'a dyn LikelihoodScorer,
    pub window_size: u64,
    pub calibration: CalibrationParams,
}

impl VariantAnalyzer<'_> {
    pub fn analyze(&self, variant: &Variant) -> Result<VariantReport> {
        info!(
            "Analyzing {}:{} {} ({})",
            variant.chromosome, variant.position, variant.alternate_allele, variant.genome_build
        );

        let window = self.source.fetch_window(
            &variant.chromosome,
            &variant.genome_build,
            variant.position,
            self.window_size,
        )?;
        if let Some(head) = window.sequence.get(..100) {
            debug!("Reference sequence head: {}", head);
        }

        let pair = prepare(&window, variant.position, variant.alternate_allele)?;
        info!(
            "Reference base at offset {}: {} -> {}",
            pair.offset, pair.reference, pair.alternative
        );
        if let Some(given) = variant.reference_allele.filter(|r| *r != pair.reference) {
            info!(
                "Requested reference base {} differs from genome base {}; using the genome",
                given, pair.reference
            );
        }

        let sequences = [pair.reference_sequence.to_string(), pair.variant_sequence.clone()];
        let scores = check_scores(2, self.scorer.score_sequences(&sequences)?)?;

        let result = classify(&pair, scores[0], scores[1], &self.calibration)?;
        info!(
            "Delta {:.6} -> {} (confidence {:.3})",
            result.delta_score, result.prediction, result.classification_confidence
        );

        Ok(VariantReport {
            result,
            position: variant.position,
        })
    }
}
