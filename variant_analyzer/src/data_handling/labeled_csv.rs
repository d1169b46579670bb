use std::path::PathBuf;

use polars::prelude::*;
use tracing::{error, info};

use crate::data_handling::brca1::VariantColumns;
use crate::data_handling::{Dataset, ALT, CHROM, CLASS, POS, REF, SCORE};
use crate::error::{AnalyzerError, Result};

/// A labelled variant table already exported to CSV with canonical column names.
pub struct LabeledCsvDataset {
    pub path: PathBuf,
    pub limit: usize,
}

impl Dataset for LabeledCsvDataset {
    fn load(&self) -> Result<DataFrame> {
        info!("Reading labelled variants from {}", self.path.display());
        let df = match CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .and_then(|reader| reader.finish())
        {
            Ok(df) => df,
            Err(e) => {
                error!("Failed to read labelled CSV: {}", e);
                return Err(e.into());
            }
        };

        for name in [CHROM, POS, REF, ALT, CLASS] {
            if df.column(name).is_err() {
                return Err(AnalyzerError::Calibration(format!(
                    "labelled table lacks column '{name}'"
                )));
            }
        }

        let df = df.head(Some(self.limit));
        let chrom = df.column(CHROM)?.cast(&DataType::String)?;
        let pos = df.column(POS)?.cast(&DataType::Int64)?;
        let reference = df.column(REF)?.cast(&DataType::String)?;
        let alt = df.column(ALT)?.cast(&DataType::String)?;
        let class = df.column(CLASS)?.cast(&DataType::String)?;
        let score = match df.column(SCORE) {
            Ok(c) => Some(c.cast(&DataType::Float64)?),
            Err(_) => None,
        };

        let (chrom, pos, reference, alt, class) =
            (chrom.str()?, pos.i64()?, reference.str()?, alt.str()?, class.str()?);

        let mut columns = VariantColumns::default();
        for i in 0..df.height() {
            let (Some(p), Some(a)) = (pos.get(i), alt.get(i)) else {
                continue;
            };
            let score = match &score {
                Some(c) => c.f64()?.get(i),
                None => None,
            };
            columns.push(
                chrom.get(i).unwrap_or_default().to_string(),
                p,
                reference.get(i).unwrap_or_default().to_string(),
                a.to_string(),
                score,
                class.get(i).unwrap_or_default(),
            );
        }

        let df = columns.into_frame()?;
        info!("Loaded {} labelled variants", df.height());
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_normalises_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chrom,pos,ref,alt,score,class").unwrap();
        writeln!(file, "17,41276045,T,g,-2.5,LOF").unwrap();
        writeln!(file, "17,41276046,A,C,0.1,FUNC").unwrap();
        writeln!(file, "17,,A,C,0.1,INT").unwrap();
        writeln!(file, "17,41276048,A,T,0.2,INT").unwrap();

        let ds = LabeledCsvDataset {
            path: file.path().to_path_buf(),
            limit: 10,
        };
        let df = ds.load().unwrap();
        assert_eq!(df.height(), 3);
        let class = df.column(CLASS).unwrap().str().unwrap();
        assert_eq!(class.get(1), Some("FUNC/INT"));
        assert_eq!(class.get(2), Some("FUNC/INT"));
        assert_eq!(df.column(ALT).unwrap().str().unwrap().get(0), Some("G"));
        assert_eq!(df.column(CHROM).unwrap().str().unwrap().get(0), Some("17"));
    }

    #[test]
    fn limit_counts_from_the_top() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chrom,pos,ref,alt,class").unwrap();
        for i in 0..5 {
            writeln!(file, "17,{},A,C,LOF", 100 + i).unwrap();
        }
        let ds = LabeledCsvDataset {
            path: file.path().to_path_buf(),
            limit: 2,
        };
        let df = ds.load().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column(SCORE).unwrap().f64().unwrap().get(0), None);
    }

    #[test]
    fn missing_column_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chrom,pos,ref,class").unwrap();
        writeln!(file, "17,100,A,LOF").unwrap();
        let ds = LabeledCsvDataset {
            path: file.path().to_path_buf(),
            limit: 2,
        };
        assert!(matches!(ds.load(), Err(AnalyzerError::Calibration(_))));
    }
}
