use std::cmp::Ordering;

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use tracing::info;

use crate::error::{AnalyzerError, Result};

/// One ROC curve: a point per distinct score, its threshold, and the trapezoid AUC.
#[derive(Debug, Clone, PartialEq)]
pub struct RocResult {
    pub fprs: Vec<f64>,
    pub tprs: Vec<f64>,
    pub thresholds: Vec<f64>,
    pub auc: f64,
}

/// Compute ROC curve points (FPR/TPR) and AUC for predicted `scores` and boolean `labels`.
///
/// 1) Pair each (score, label) and sort descending by score.
/// 2) Emit one point per distinct score, after every sample at that score has
///    been counted; the curve opens at (0, 0) with a `+inf` threshold.
/// 3) Integrate with the trapezoidal rule, so tied scores count as half.
pub fn compute_roc(scores: &[f64], labels: &[bool]) -> Result<RocResult> {
    if scores.len() != labels.len() {
        return Err(AnalyzerError::Calibration(format!(
            "{} scores for {} labels",
            scores.len(),
            labels.len()
        )));
    }

    let total_pos = labels.iter().filter(|&&l| l).count() as f64;
    let total_neg = labels.len() as f64 - total_pos;
    if total_pos == 0.0 || total_neg == 0.0 {
        return Err(AnalyzerError::Calibration(
            "ROC needs both positive and negative samples".into(),
        ));
    }

    let mut pairs: Vec<(f64, bool)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    pairs.sort_by(|(s1, _), (s2, _)| s2.partial_cmp(s1).unwrap_or(Ordering::Equal));

    let mut fprs = vec![0.0];
    let mut tprs = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];
    let mut auc = 0.0;

    let (mut tp, mut fp) = (0.0, 0.0);
    for (idx, &(score, label)) in pairs.iter().enumerate() {
        if label {
            tp += 1.0;
        } else {
            fp += 1.0;
        }

        let last_of_score = pairs.get(idx + 1).map_or(true, |(next, _)| *next != score);
        if last_of_score {
            let tpr = tp / total_pos;
            let fpr = fp / total_neg;
            let (prev_fpr, prev_tpr) = (fprs[fprs.len() - 1], tprs[tprs.len() - 1]);
            auc += (fpr - prev_fpr) * (tpr + prev_tpr) * 0.5;

            fprs.push(fpr);
            tprs.push(tpr);
            thresholds.push(score);
        }
    }

    Ok(RocResult {
        fprs,
        tprs,
        thresholds,
        auc,
    })
}

/// Index of the ROC point maximising Youden's J (`tpr - fpr`); the first wins on ties.
pub fn youden_index(roc: &RocResult) -> Result<usize> {
    let j: Array1<f64> = roc
        .tprs
        .iter()
        .zip(&roc.fprs)
        .map(|(tpr, fpr)| tpr - fpr)
        .collect();
    let best = j
        .argmax()
        .map_err(|e| AnalyzerError::Calibration(format!("Youden J undefined: {e}")))?;
    info!(
        "Youden J = {:.3} at threshold {:.6}",
        j[best], roc.thresholds[best]
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_separation() {
        let roc = compute_roc(&[0.9, 0.8, 0.2, 0.1], &[true, true, false, false]).unwrap();
        assert!((roc.auc - 1.0).abs() < 1e-12);
        let best = youden_index(&roc).unwrap();
        assert_eq!(roc.thresholds[best], 0.8);
        assert_eq!((roc.fprs[best], roc.tprs[best]), (0.0, 1.0));
    }

    #[test]
    fn auc_matches_pairwise_ranking() {
        // 3 positives, 3 negatives: 6 of 9 positive/negative pairs ordered correctly
        let scores = [0.9, 0.7, 0.6, 0.5, 0.3, 0.2];
        let labels = [true, false, true, false, true, false];
        let roc = compute_roc(&scores, &labels).unwrap();
        assert!((roc.auc - 6.0 / 9.0).abs() < 1e-12);
        assert_eq!(roc.thresholds[0], f64::INFINITY);
        assert_eq!(roc.fprs.len(), scores.len() + 1);
        assert_eq!(*roc.fprs.last().unwrap(), 1.0);
        assert_eq!(*roc.tprs.last().unwrap(), 1.0);
    }

    #[test]
    fn ties_collapse_into_one_point_and_count_half() {
        let roc = compute_roc(&[0.5, 0.5], &[true, false]).unwrap();
        assert_eq!(roc.thresholds, vec![f64::INFINITY, 0.5]);
        assert!((roc.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_rejected() {
        assert!(compute_roc(&[0.1, 0.2], &[true, true]).is_err());
        assert!(compute_roc(&[0.1], &[true, false]).is_err());
    }

    #[test]
    fn youden_prefers_first_maximum() {
        let roc = RocResult {
            fprs: vec![0.0, 0.0, 0.5, 0.5, 1.0],
            tprs: vec![0.0, 0.5, 0.5, 1.0, 1.0],
            thresholds: vec![f64::INFINITY, 4.0, 3.0, 2.0, 1.0],
            auc: 0.75,
        };
        assert_eq!(youden_index(&roc).unwrap(), 1);
    }
}
