//! Runtime configuration, read from a JSON file with every field defaulted.
//!
//! ```json
//! {
//!   "ucsc_base_url": "https://api.genome.ucsc.edu",
//!   "window_size": 8192,
//!   "calibration": {"threshold": -0.0009178519, "lof_std": 0.0015140239, "func_std": 0.0009016589},
//!   "scorer": {"python": "python3", "script": "scripts/evo2_worker.py", "model_name": "evo2_7b"},
//!   "server": {"bind": "0.0.0.0:8000"},
//!   "batch": {"limit": 500, "header_row": 2}
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use sequence_retriever::{DEFAULT_WINDOW_SIZE, UCSC_API_URL};

use crate::error::Result;
use crate::helper_functions::project_root;
use crate::models::CalibrationParams;

pub const CONFIG_FILE_NAME: &str = "variant_analyzer.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub ucsc_base_url: String,
    pub window_size: u64,
    pub calibration: CalibrationParams,
    pub scorer: ScorerConfig,
    pub server: ServerConfig,
    pub batch: BatchConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ucsc_base_url: UCSC_API_URL.to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            calibration: CalibrationParams::default(),
            scorer: ScorerConfig::default(),
            server: ServerConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Interpreter name looked up on `PATH`, or an explicit path.
    pub python: String,
    pub script: PathBuf,
    pub model_name: String,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            script: project_root().join("scripts/evo2_worker.py"),
            model_name: "evo2_7b".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Rows of the labelled table used for calibration.
    pub limit: usize,
    /// 0-indexed worksheet row holding the column names.
    pub header_row: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            limit: 500,
            header_row: 2,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: AnalyzerConfig = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.calibration.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Explicit path first, then `$PROJECT_ROOT/variant_analyzer.json`, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let fallback = project_root().join(CONFIG_FILE_NAME);
        if fallback.exists() {
            return Self::from_path(fallback);
        }
        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::error::AnalyzerError;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"window_size": 4097, "calibration": {{"threshold": -0.002, "lof_std": 0.1, "func_std": 0.2}}}}"#
        )
        .unwrap();

        let config = AnalyzerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.window_size, 4097);
        assert_eq!(config.calibration.threshold, -0.002);
        assert_eq!(config.ucsc_base_url, UCSC_API_URL);
        assert_eq!(config.scorer.model_name, "evo2_7b");
        assert_eq!(config.batch, BatchConfig::default());
    }

    #[test]
    fn unusable_calibration_block_is_refused_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"calibration": {{"threshold": -0.002, "lof_std": -0.1, "func_std": 0.2}}}}"#
        )
        .unwrap();
        assert!(matches!(
            AnalyzerConfig::from_path(file.path()),
            Err(AnalyzerError::Calibration(_))
        ));
    }

    #[test]
    fn defaults_match_baked_constants() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.window_size, 8192);
        assert_eq!(config.calibration.threshold, -0.0009178519);
        assert_eq!(config.calibration.lof_std, 0.0015140239);
        assert_eq!(config.calibration.func_std, 0.0009016589);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(AnalyzerConfig::load(Some(Path::new("/nonexistent/variant_analyzer.json"))).is_err());
    }
}
