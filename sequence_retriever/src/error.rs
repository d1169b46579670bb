// src/error.rs

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SequenceError>;

#[derive(Debug, Error)]
pub enum SequenceError {
    /// The sequence service answered with anything other than HTTP 200.
    #[error("failed to fetch genome data from UCSC API: HTTP {status}")]
    Fetch { status: u16 },

    /// A well-formed response that lacks the expected payload.
    #[error("UCSC API error: {message}")]
    Service { message: String },

    /// The requested window does not fit in genomic coordinates.
    #[error("window of {window_size}bp around position {position} exceeds the coordinate range")]
    Coordinates { position: u64, window_size: u64 },

    #[error("sequence service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed reference FASTA: {0}")]
    Fasta(String),
}

impl SequenceError {
    /// Builds a `Service` error from the `error` field UCSC places in failed payloads.
    pub fn from_payload(body: &Value) -> Self {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        SequenceError::Service { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_error_carries_reported_message() {
        let err = SequenceError::from_payload(&json!({"error": "chrom chr99 not found"}));
        assert_eq!(err.to_string(), "UCSC API error: chrom chr99 not found");
    }

    #[test]
    fn service_error_defaults_to_unknown() {
        let err = SequenceError::from_payload(&json!({"downloadTime": "now"}));
        match err {
            SequenceError::Service { message } => assert_eq!(message, "unknown"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
