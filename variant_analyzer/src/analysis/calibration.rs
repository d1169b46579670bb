//! Offline calibration: score every labelled variant, then derive the
//! decision threshold and per-class delta spread the online classifier uses.

use std::collections::HashMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use sequence_retriever::ReferenceSequence;

use crate::analysis::roc::{compute_roc, youden_index, RocResult};
use crate::data_handling::{ALT, CLASS, DELTA, POS};
use crate::error::{AnalyzerError, Result};
use crate::models::{parse_base, CalibrationParams, FUNC_INT, LOF};
use crate::prediction_tools::scorer::check_scores;
use crate::prediction_tools::LikelihoodScorer;
use crate::substitution::substitute;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    #[serde(flatten)]
    pub params: CalibrationParams,
    pub auroc: f64,
}

/// Scored table, derived calibration and the ROC curve it was read from.
///
/// `roc` is computed on `-delta`, so its thresholds are negated deltas.
#[derive(Debug, Clone)]
pub struct CalibrationRun {
    pub scored: DataFrame,
    pub report: CalibrationReport,
    pub roc: RocResult,
}

/// Unique reference windows plus one mutated window per table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowBatch {
    pub ref_seqs: Vec<String>,
    /// Row → index into `ref_seqs`.
    pub ref_indexes: Vec<usize>,
    pub var_seqs: Vec<String>,
}

pub fn build_windows(
    df: &DataFrame,
    reference: &ReferenceSequence,
    window_size: usize,
) -> Result<WindowBatch> {
    let pos = df.column(POS)?.i64()?;
    let alt = df.column(ALT)?.str()?;

    let mut ref_seqs: Vec<String> = Vec::new();
    let mut ref_seq_to_index: HashMap<&str, usize> = HashMap::new();
    let mut ref_indexes = Vec::with_capacity(df.height());
    let mut var_seqs = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let (Some(p), Some(a)) = (pos.get(i), alt.get(i)) else {
            return Err(AnalyzerError::Calibration(format!(
                "row {i} lacks a position or alternate allele"
            )));
        };
        let out_of_range = || AnalyzerError::OutOfRange {
            position: p.max(0) as u64,
            window_start: 1,
            window_end: reference.len() as u64,
        };

        let window = u64::try_from(p)
            .ok()
            .and_then(|p| reference.window_around(p, window_size))
            .ok_or_else(out_of_range)?;
        let var_seq =
            substitute(window.sequence, window.offset, parse_base(a)?).ok_or_else(out_of_range)?;

        let index = *ref_seq_to_index.entry(window.sequence).or_insert_with(|| {
            ref_seqs.push(window.sequence.to_string());
            ref_seqs.len() - 1
        });
        ref_indexes.push(index);
        var_seqs.push(var_seq);
    }

    Ok(WindowBatch {
        ref_seqs,
        ref_indexes,
        var_seqs,
    })
}

/// `var_score[row] - ref_score[ref_indexes[row]]`, from two batched scoring calls.
pub fn score_deltas(batch: &WindowBatch, scorer: &dyn LikelihoodScorer) -> Result<Vec<f64>> {
    info!(
        "Scoring likelihoods of {} reference sequences with Evo 2...",
        batch.ref_seqs.len()
    );
    let ref_scores = check_scores(batch.ref_seqs.len(), scorer.score_sequences(&batch.ref_seqs)?)?;

    info!(
        "Scoring likelihoods of {} variant sequences with Evo 2...",
        batch.var_seqs.len()
    );
    let var_scores = check_scores(batch.var_seqs.len(), scorer.score_sequences(&batch.var_seqs)?)?;

    Ok(var_scores
        .iter()
        .zip(&batch.ref_indexes)
        .map(|(var, &i)| var - ref_scores[i])
        .collect())
}

/// Sample standard deviation (ddof = 1) of the delta column within one class.
fn class_std(df: &DataFrame, class: &str) -> Result<f64> {
    let mask = df.column(CLASS)?.str()?.equal(class);
    let subset = df.filter(&mask)?;
    let deltas = subset.column(DELTA)?.f64()?;
    if deltas.len() - deltas.null_count() < 2 {
        return Err(AnalyzerError::Calibration(format!(
            "need at least two {class} variants to estimate spread, got {}",
            deltas.len() - deltas.null_count()
        )));
    }
    deltas
        .std(1)
        .ok_or_else(|| AnalyzerError::Calibration(format!("{class} spread undefined")))
}

/// Threshold, class spreads and AUROC from a table carrying `class` and delta columns.
///
/// LOF is the positive class and is ranked by `-delta`, so the ROC threshold is
/// negated back onto the delta scale.
pub fn derive_calibration(df: &DataFrame) -> Result<(CalibrationReport, RocResult)> {
    let deltas: Vec<f64> = df
        .column(DELTA)?
        .f64()?
        .into_iter()
        .map(|d| d.map_or(f64::NAN, |d| -d))
        .collect();
    let is_lof: Vec<bool> = df
        .column(CLASS)?
        .str()?
        .equal(LOF)
        .into_iter()
        .map(|b| b.unwrap_or(false))
        .collect();

    let roc = compute_roc(&deltas, &is_lof)?;
    let best = youden_index(&roc)?;

    let params = CalibrationParams {
        threshold: -roc.thresholds[best],
        lof_std: class_std(df, LOF)?,
        func_std: class_std(df, FUNC_INT)?,
    };
    info!(
        "Confidence params: threshold = {:.10}, lof_std = {:.10}, func_std = {:.10}",
        params.threshold, params.lof_std, params.func_std
    );
    info!("AUROC = {:.4}", roc.auc);

    let report = CalibrationReport {
        params,
        auroc: roc.auc,
    };
    Ok((report, roc))
}

/// Scores a labelled table, attaches the delta column and derives the calibration.
pub fn run_calibration(
    df: &DataFrame,
    reference: &ReferenceSequence,
    scorer: &dyn LikelihoodScorer,
    window_size: usize,
) -> Result<CalibrationRun> {
    if df.height() == 0 {
        return Err(AnalyzerError::Calibration("labelled table is empty".into()));
    }

    let batch = build_windows(df, reference, window_size)?;
    let deltas = score_deltas(&batch, scorer)?;

    let mut scored = df.clone();
    scored.with_column(Series::new(DELTA.into(), deltas))?;

    let (report, roc) = derive_calibration(&scored)?;
    Ok(CalibrationRun {
        scored,
        report,
        roc,
    })
}
