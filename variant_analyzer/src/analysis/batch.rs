// src/analysis/batch.rs
// -----------------------------------------------------------------------------
// BRCA1 calibration job: labelled table + chr17 reference in, scored records,
// calibration parameters, strip plot and a JSON report out.
// -----------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use sequence_retriever::ReferenceSequence;

use crate::analysis::calibration::{run_calibration, CalibrationReport, CalibrationRun};
use crate::analysis::roc::RocResult;
use crate::analysis::stripplot::{deltas_by_class, strip_plot_base64};
use crate::data_handling::{Dataset, ALT, CHROM, CLASS, DELTA, POS, REF, SCORE};
use crate::error::Result;
use crate::helper_functions::{dataframe_to_csv, write_json};
use crate::prediction_tools::LikelihoodScorer;

pub const RECORDS_FILE: &str = "brca1_evo2_records.csv";
pub const CALIBRATION_FILE: &str = "calibration.json";
pub const ROC_FILE: &str = "brca1_evo2_roc.csv";
pub const PLOT_FILE: &str = "brca1_evo2_stripplot.png";
pub const PLOT_BASE64_FILE: &str = "brca1_evo2_stripplot.b64";
pub const REPORT_FILE: &str = "brca1_evo2_report.json";

/// One scored row of the labelled table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub chrom: String,
    pub pos: i64,
    #[serde(rename = "ref")]
    pub reference: String,
    pub alt: String,
    pub score: Option<f64>,
    pub class: String,
    pub evo2_delta_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub variants: Vec<VariantRecord>,
    /// Strip plot PNG, base64 encoded.
    pub plot: String,
    pub auroc: f64,
    pub calibration: CalibrationReport,
}

/// ROC point with its threshold mapped back onto the delta scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct RocPoint {
    delta_threshold: f64,
    fpr: f64,
    tpr: f64,
}

pub struct BatchJob<'a> {
    pub dataset: &'a dyn Dataset,
    pub reference_path: PathBuf,
    pub window_size: usize,
    /// Outputs are written here when set; otherwise only the report is returned.
    pub out_dir: Option<PathBuf>,
}

pub fn records_from_frame(df: &DataFrame) -> Result<Vec<VariantRecord>> {
    let chrom = df.column(CHROM)?.str()?;
    let pos = df.column(POS)?.i64()?;
    let reference = df.column(REF)?.str()?;
    let alt = df.column(ALT)?.str()?;
    let score = df.column(SCORE)?.f64()?;
    let class = df.column(CLASS)?.str()?;
    let delta = df.column(DELTA)?.f64()?;

    Ok((0..df.height())
        .map(|i| VariantRecord {
            chrom: chrom.get(i).unwrap_or_default().to_string(),
            pos: pos.get(i).unwrap_or_default(),
            reference: reference.get(i).unwrap_or_default().to_string(),
            alt: alt.get(i).unwrap_or_default().to_string(),
            score: score.get(i),
            class: class.get(i).unwrap_or_default().to_string(),
            evo2_delta_score: delta.get(i).unwrap_or(f64::NAN),
        })
        .collect())
}

impl BatchJob<'_> {
    pub fn run(&self, scorer: &dyn LikelihoodScorer) -> Result<BatchReport> {
        let df = self.dataset.load()?;
        let reference = ReferenceSequence::from_fasta(&self.reference_path)?;
        info!(
            "Reference {} loaded ({} bp)",
            reference.id,
            reference.len()
        );

        let CalibrationRun {
            mut scored,
            report: calibration,
            roc,
        } = run_calibration(&df, &reference, scorer, self.window_size)?;

        let groups = deltas_by_class(&scored)?;
        let plot_path = self.out_dir.as_deref().map(|dir| dir.join(PLOT_FILE));
        if let Some(dir) = &self.out_dir {
            fs::create_dir_all(dir)?;
        }
        let plot = strip_plot_base64(&groups, plot_path.as_deref())?;

        let report = BatchReport {
            variants: records_from_frame(&scored)?,
            plot,
            auroc: calibration.auroc,
            calibration,
        };

        if let Some(dir) = &self.out_dir {
            write_outputs(dir, &mut scored, &roc, &report)?;
        }
        Ok(report)
    }
}

/// Writes the curve computed on `-delta` with thresholds negated back to deltas.
pub fn write_roc_curve(roc: &RocResult, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for ((threshold, fpr), tpr) in roc.thresholds.iter().zip(&roc.fprs).zip(&roc.tprs) {
        wtr.serialize(RocPoint {
            delta_threshold: -threshold,
            fpr: *fpr,
            tpr: *tpr,
        })?;
    }
    wtr.flush()?;
    info!("Wrote {} ROC points to {}", roc.fprs.len(), path.display());
    Ok(())
}

fn write_outputs(
    dir: &Path,
    scored: &mut DataFrame,
    roc: &RocResult,
    report: &BatchReport,
) -> Result<()> {
    dataframe_to_csv(scored, dir.join(RECORDS_FILE))?;
    write_roc_curve(roc, &dir.join(ROC_FILE))?;
    write_json(&report.calibration, dir.join(CALIBRATION_FILE))?;
    fs::write(dir.join(PLOT_BASE64_FILE), &report.plot)?;
    write_json(report, dir.join(REPORT_FILE))?;
    Ok(())
}
