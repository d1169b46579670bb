// src/classification.rs

use sequence_retriever::GenomicWindow;
use tracing::debug;

use crate::error::{AnalyzerError, Result};
use crate::models::{CalibrationParams, ClassificationResult, Prediction, FUNC_INT, LOF};
use crate::substitution::substitute;

/// Reference window and its mutated copy, ready to be scored together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPair<'a> {
    pub offset: usize,
    pub reference: char,
    pub alternative: char,
    pub reference_sequence: &'a str,
    pub variant_sequence: String,
}

/// Locates a 1-indexed `position` inside `window` and builds the variant sequence.
pub fn prepare<'a>(
    window: &'a GenomicWindow,
    position: u64,
    alternative: char,
) -> Result<ScoringPair<'a>> {
    let out_of_range = || AnalyzerError::OutOfRange {
        position,
        window_start: window.start + 1,
        window_end: window.end(),
    };

    let offset = window.offset_of(position).ok_or_else(out_of_range)?;
    debug!("Relative position within window: {}", offset);

    let reference = window.sequence.as_bytes()[offset] as char;
    let variant_sequence =
        substitute(&window.sequence, offset, alternative).ok_or_else(out_of_range)?;

    Ok(ScoringPair {
        offset,
        reference,
        alternative,
        reference_sequence: &window.sequence,
        variant_sequence,
    })
}

/// Applies the calibrated threshold to a delta score.
///
/// Deltas strictly below the threshold are called pathogenic; a delta equal to
/// the threshold is benign. Confidence is the distance to the threshold in units
/// of the predicted class's standard deviation, capped at 1.0.
pub fn classify_delta(delta: f64, params: &CalibrationParams) -> Result<(Prediction, f64)> {
    if !delta.is_finite() {
        return Err(AnalyzerError::Scoring(format!("delta score is not finite: {delta}")));
    }
    if !params.threshold.is_finite() {
        return Err(AnalyzerError::Calibration(format!(
            "threshold must be finite, got {}",
            params.threshold
        )));
    }

    let (prediction, std, class) = if delta < params.threshold {
        (Prediction::LikelyPathogenic, params.lof_std, LOF)
    } else {
        (Prediction::LikelyBenign, params.func_std, FUNC_INT)
    };

    if std == 0.0 {
        return Err(AnalyzerError::DivideByZero { class });
    }
    if !(std.is_finite() && std > 0.0) {
        return Err(AnalyzerError::Calibration(format!(
            "{class} standard deviation must be finite and positive, got {std}"
        )));
    }

    let confidence = ((delta - params.threshold).abs() / std).min(1.0);
    Ok((prediction, confidence))
}

pub fn classify(
    pair: &ScoringPair<'_>,
    ref_score: f64,
    var_score: f64,
    params: &CalibrationParams,
) -> Result<ClassificationResult> {
    let delta_score = var_score - ref_score;
    let (prediction, classification_confidence) = classify_delta(delta_score, params)?;

    Ok(ClassificationResult {
        reference: pair.reference,
        alternative: pair.alternative,
        delta_score,
        prediction,
        classification_confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(seq: &str) -> GenomicWindow {
        GenomicWindow {
            chromosome: "chr17".into(),
            genome_build: "hg38".into(),
            start: 1000,
            sequence: seq.into(),
        }
    }

    #[test]
    fn prepare_substitutes_and_reads_reference() {
        let w = window("AAGAA");
        let pair = prepare(&w, 1003, 'T').unwrap();
        assert_eq!(pair.offset, 2);
        assert_eq!(pair.reference, 'G');
        assert_eq!(pair.variant_sequence, "AATAA");
        assert_eq!(pair.reference_sequence, "AAGAA");
    }

    #[test]
    fn prepare_accepts_both_window_edges() {
        let w = window("ACGTA");
        assert_eq!(prepare(&w, 1001, 'G').unwrap().offset, 0);
        assert_eq!(prepare(&w, 1005, 'G').unwrap().offset, 4);
    }

    #[test]
    fn prepare_rejects_position_past_window() {
        let w = window("ACGTA");
        match prepare(&w, 1006, 'G') {
            Err(AnalyzerError::OutOfRange {
                position,
                window_start,
                window_end,
            }) => {
                assert_eq!(position, 1006);
                assert_eq!(window_start, 1001);
                assert_eq!(window_end, 1005);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert!(matches!(
            prepare(&w, 1000, 'G'),
            Err(AnalyzerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn below_threshold_is_pathogenic() {
        let w = window("AAAAA");
        let pair = prepare(&w, 1003, 'T').unwrap();
        let result = classify(&pair, -10.0, -10.001, &CalibrationParams::default()).unwrap();
        assert_eq!(result.prediction, Prediction::LikelyPathogenic);
        assert!((result.delta_score + 0.001).abs() < 1e-9);
        assert!((result.classification_confidence - 0.0543).abs() < 1e-3);
        assert_eq!(result.reference, 'A');
        assert_eq!(result.alternative, 'T');
    }

    #[test]
    fn above_threshold_is_benign_and_clamped() {
        let w = window("AAAAA");
        let pair = prepare(&w, 1003, 'T').unwrap();
        let result = classify(&pair, -10.0, -9.999, &CalibrationParams::default()).unwrap();
        assert_eq!(result.prediction, Prediction::LikelyBenign);
        assert_eq!(result.classification_confidence, 1.0);
    }

    #[test]
    fn delta_equal_to_threshold_is_benign() {
        let params = CalibrationParams::default();
        let (prediction, confidence) = classify_delta(params.threshold, &params).unwrap();
        assert_eq!(prediction, Prediction::LikelyBenign);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let params = CalibrationParams::default();
        for delta in [-1e6, -0.5, -0.002, -0.0009, 0.0, 0.0005, 3.0, 1e9] {
            let (_, c) = classify_delta(delta, &params).unwrap();
            assert!((0.0..=1.0).contains(&c), "confidence {c} for delta {delta}");
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let params = CalibrationParams::default();
        let a = classify_delta(-0.0012, &params).unwrap();
        let b = classify_delta(-0.0012, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_spread_fails_instead_of_infinite_confidence() {
        let params = CalibrationParams {
            lof_std: 0.0,
            ..CalibrationParams::default()
        };
        assert!(matches!(
            classify_delta(-0.01, &params),
            Err(AnalyzerError::DivideByZero { class: "LOF" })
        ));
        // the benign side is unaffected by a degenerate LOF spread
        assert!(classify_delta(0.01, &params).is_ok());
    }

    #[test]
    fn negative_spread_is_rejected() {
        let params = CalibrationParams {
            lof_std: -0.0015140239,
            ..CalibrationParams::default()
        };
        assert!(matches!(
            classify_delta(-0.001, &params),
            Err(AnalyzerError::Calibration(_))
        ));
    }

    #[test]
    fn nan_spread_is_rejected() {
        let params = CalibrationParams {
            lof_std: f64::NAN,
            ..CalibrationParams::default()
        };
        assert!(matches!(
            classify_delta(-0.001, &params),
            Err(AnalyzerError::Calibration(_))
        ));

        let params = CalibrationParams {
            func_std: f64::INFINITY,
            ..CalibrationParams::default()
        };
        assert!(classify_delta(0.001, &params).is_err());
    }

    #[test]
    fn non_finite_delta_is_rejected() {
        let params = CalibrationParams::default();
        assert!(matches!(
            classify_delta(f64::NAN, &params),
            Err(AnalyzerError::Scoring(_))
        ));
    }
}
