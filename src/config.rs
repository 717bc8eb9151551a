use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filter::FilterColumns;
use crate::data::loader::LoadOptions;

pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/sumukhahe/ML_Project/main/data/dataset.csv";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Settings read from an optional JSON file. Every field has a default, so
/// `{}` is a valid configuration.
///
/// ```json
/// {
///   "source_url": "https://example.org/dataset.csv",
///   "timeout_secs": 30,
///   "columns": { "state": "State", "crop": "Crop", "year": "year" },
///   "predictor": { "features": ["Annual_rainfall", "MSP"], "target": "Yield_(kg/Ha)" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source_url: String,
    pub timeout_secs: u64,
    pub columns: FilterColumns,
    /// Columns checked when the session starts; defaults to the selector columns.
    pub required_columns: Option<Vec<String>>,
    pub histogram_bins: usize,
    pub top_n: usize,
    pub predictor: PredictorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub features: Vec<String>,
    pub target: String,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            features: vec![
                "Annual_rainfall".to_string(),
                "MSP".to_string(),
                "Production_(in_Tonnes)".to_string(),
            ],
            target: "Yield_(kg/Ha)".to_string(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 30,
            columns: FilterColumns::default(),
            required_columns: None,
            histogram_bins: crate::data::stats::DEFAULT_HISTOGRAM_BINS,
            top_n: 5,
            predictor: PredictorConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Read the configuration file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn required_columns(&self) -> Vec<String> {
        self.required_columns.clone().unwrap_or_else(|| {
            vec![
                self.columns.state.clone(),
                self.columns.crop.clone(),
                self.columns.year.clone(),
            ]
        })
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_is_default() {
        let config: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.required_columns(), vec!["State", "Crop", "year"]);
        assert_eq!(config.histogram_bins, 30);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{"columns": {"year": "Year"}, "predictor": {"target": "Yield"}}"#,
        )
        .unwrap();
        assert_eq!(config.columns.year, "Year");
        assert_eq!(config.columns.state, "State");
        assert_eq!(config.required_columns(), vec!["State", "Crop", "Year"]);
        assert_eq!(config.predictor.target, "Yield");
        assert_eq!(config.predictor.features.len(), 3);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_secs": 5, "top_n": 3}}"#).unwrap();
        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.load_options().timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_file_reports_path() {
        let err = DashboardConfig::load(Some(Path::new("/no/such/config.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/config.json"));
    }
}
