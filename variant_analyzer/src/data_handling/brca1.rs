// src/data_handling/brca1.rs
// -----------------------------------------------------------------------------
// Findlay et al. 2018 BRCA1 saturation genome editing table (Supplementary
// Table 1). Column names sit on the third worksheet row; everything above is
// caption text.
// -----------------------------------------------------------------------------

use std::path::PathBuf;

use calamine::{open_workbook_auto, DataType as Cell, Reader};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::data_handling::{collapse_class, Dataset, ALT, CHROM, CLASS, POS, REF, SCORE};
use crate::error::{AnalyzerError, Result};

/// Source header → canonical column name.
const SOURCE_COLUMNS: [(&str, &str); 6] = [
    ("chromosome", CHROM),
    ("position (hg19)", POS),
    ("reference", REF),
    ("alt", ALT),
    ("function.score.mean", SCORE),
    ("func.class", CLASS),
];

pub struct Brca1Dataset {
    pub path: PathBuf,
    /// 0-indexed row holding the column names.
    pub header_row: usize,
    /// Number of data rows to keep, counted from the top of the sheet.
    pub limit: usize,
}

fn cell_to_string(cell: &Cell) -> String {
    match cell {
        Cell::String(s) => s.trim().to_string(),
        Cell::Empty => String::new(),
        Cell::Bool(b) => b.to_string(),
        Cell::Error(e) => format!("ERR({e:?})"),
        Cell::Float(n) | Cell::Duration(n) => n.to_string(),
        Cell::Int(i) => i.to_string(),
        Cell::DateTime(f) => f.to_string(),
        Cell::DateTimeIso(s) | Cell::DurationIso(s) => s.clone(),
    }
}

fn cell_to_position(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(i) if *i > 0 => Some(*i),
        Cell::Float(f) if *f >= 1.0 && f.fract() == 0.0 => Some(*f as i64),
        Cell::String(s) => s.trim().parse::<i64>().ok().filter(|p| *p > 0),
        _ => None,
    }
}

fn cell_to_f64(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Float(f) => Some(*f),
        Cell::Int(i) => Some(*i as f64),
        Cell::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Typed columns accumulated row by row before becoming a DataFrame.
#[derive(Default)]
pub(crate) struct VariantColumns {
    chrom: Vec<String>,
    pos: Vec<i64>,
    reference: Vec<String>,
    alt: Vec<String>,
    score: Vec<Option<f64>>,
    class: Vec<String>,
}

impl VariantColumns {
    pub(crate) fn push(
        &mut self,
        chrom: String,
        pos: i64,
        reference: String,
        alt: String,
        score: Option<f64>,
        class: &str,
    ) {
        self.chrom.push(chrom);
        self.pos.push(pos);
        self.reference.push(reference.to_ascii_uppercase());
        self.alt.push(alt.to_ascii_uppercase());
        self.score.push(score);
        self.class.push(collapse_class(class));
    }

    pub(crate) fn into_frame(self) -> Result<DataFrame> {
        let series = vec![
            Series::new(CHROM.into(), self.chrom),
            Series::new(POS.into(), self.pos),
            Series::new(REF.into(), self.reference),
            Series::new(ALT.into(), self.alt),
            Series::new(SCORE.into(), self.score),
            Series::new(CLASS.into(), self.class),
        ];
        Ok(DataFrame::new(series.into_iter().map(Into::into).collect())?)
    }
}

impl Dataset for Brca1Dataset {
    fn load(&self) -> Result<DataFrame> {
        info!("Reading BRCA1 variant table from {}", self.path.display());

        let mut wb = open_workbook_auto(&self.path)?;
        let range = wb
            .worksheet_range_at(0)
            .ok_or_else(|| AnalyzerError::Spreadsheet("worksheet missing".into()))??;

        let mut rows = range.rows().skip(self.header_row);
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| AnalyzerError::Spreadsheet("header row missing".into()))?
            .iter()
            .map(cell_to_string)
            .collect();
        debug!("BRCA1 header = {:?}", headers);

        let mut idx = [0usize; 6];
        for (slot, (source, _)) in idx.iter_mut().zip(SOURCE_COLUMNS.iter()) {
            *slot = headers.iter().position(|h| h == source).ok_or_else(|| {
                AnalyzerError::Spreadsheet(format!("column '{source}' not found"))
            })?;
        }
        let [chrom_i, pos_i, ref_i, alt_i, score_i, class_i] = idx;

        let mut columns = VariantColumns::default();
        let mut skipped = 0usize;
        for row in rows.take(self.limit) {
            let cell = |i: usize| row.get(i).unwrap_or(&Cell::Empty);
            let Some(pos) = cell_to_position(cell(pos_i)) else {
                skipped += 1;
                continue;
            };
            let alt = cell_to_string(cell(alt_i));
            if alt.is_empty() {
                skipped += 1;
                continue;
            }
            columns.push(
                cell_to_string(cell(chrom_i)),
                pos,
                cell_to_string(cell(ref_i)),
                alt,
                cell_to_f64(cell(score_i)),
                &cell_to_string(cell(class_i)),
            );
        }

        if skipped > 0 {
            warn!("Skipped {} rows without a position or alternate allele", skipped);
        }

        let df = columns.into_frame()?;
        info!("Loaded {} BRCA1 variants", df.height());
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_convert_like_excel_shows_them() {
        assert_eq!(cell_to_string(&Cell::Float(17.0)), "17");
        assert_eq!(cell_to_string(&Cell::String(" A ".into())), "A");
        assert_eq!(cell_to_position(&Cell::Float(41276045.0)), Some(41276045));
        assert_eq!(cell_to_position(&Cell::String("41276045".into())), Some(41276045));
        assert_eq!(cell_to_position(&Cell::Float(0.5)), None);
        assert_eq!(cell_to_position(&Cell::Empty), None);
        assert_eq!(cell_to_f64(&Cell::Float(-1.25)), Some(-1.25));
        assert_eq!(cell_to_f64(&Cell::Empty), None);
    }

    #[test]
    fn columns_build_a_typed_frame() {
        let mut columns = VariantColumns::default();
        columns.push("17".into(), 41276045, "t".into(), "g".into(), Some(-2.1), "LOF");
        columns.push("17".into(), 41276046, "A".into(), "C".into(), None, "INT");
        let df = columns.into_frame().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column(POS).unwrap().i64().unwrap().get(1), Some(41276046));
        assert_eq!(df.column(ALT).unwrap().str().unwrap().get(0), Some("G"));
        assert_eq!(df.column(CLASS).unwrap().str().unwrap().get(1), Some("FUNC/INT"));
        assert_eq!(df.column(SCORE).unwrap().f64().unwrap().get(1), None);
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let ds = Brca1Dataset {
            path: "/nonexistent/brca1.xlsx".into(),
            header_row: 2,
            limit: 500,
        };
        assert!(ds.load().is_err());
    }
}
