// src/error.rs

use polars::prelude::PolarsError;
use sequence_retriever::SequenceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// `window_start`/`window_end` are the 1-indexed inclusive span actually fetched.
    #[error(
        "variant position {position} is outside the fetched window (start = {window_start}, end = {window_end})"
    )]
    OutOfRange {
        position: u64,
        window_start: u64,
        window_end: u64,
    },

    #[error("cannot derive confidence: {class} standard deviation is zero")]
    DivideByZero { class: &'static str },

    #[error("invalid variant: {0}")]
    InvalidVariant(String),

    #[error("scoring failed: {0}")]
    Scoring(String),

    #[error("calibration failed: {0}")]
    Calibration(String),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("plot error: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<calamine::Error> for AnalyzerError {
    fn from(e: calamine::Error) -> Self {
        AnalyzerError::Spreadsheet(e.to_string())
    }
}

impl AnalyzerError {
    /// HTTP status used when the error surfaces through the analysis endpoint.
    pub fn http_status(&self) -> u16 {
        match self {
            AnalyzerError::InvalidVariant(_)
            | AnalyzerError::Sequence(SequenceError::Coordinates { .. }) => 400,
            AnalyzerError::OutOfRange { .. } => 422,
            AnalyzerError::Sequence(
                SequenceError::Fetch { .. }
                | SequenceError::Service { .. }
                | SequenceError::Transport(_),
            ) => 502,
            _ => 500,
        }
    }
}
