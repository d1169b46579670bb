//! Evo 2 variant effect scoring: single-variant classification against a
//! calibrated threshold and the BRCA1 calibration job that produces it.

pub mod analysis;
pub mod classification;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod helper_functions;
pub mod models;
pub mod prediction_tools;
pub mod server;
pub mod single_variant;
pub mod substitution;

pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use models::{CalibrationParams, ClassificationResult, Prediction, Variant, VariantReport};
pub use single_variant::VariantAnalyzer;
