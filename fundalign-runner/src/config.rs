//! Serializable run configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) describes
//! the standard document layout:
//!
//! ```toml
//! symbol = "1101.TW"
//! input = "output_clean_date_technical.json"
//! output_dir = "."
//! unmapped_periods = "fail"      # or "drop"
//! recovery = "start_date"        # or "identity_key"
//!
//! [sections]
//! fundamentals = ["balanceSheetStatementGrowth", "cashFlowStatementGrowth",
//!                 "incomeStatementGrowth", "financialGrowth", "ratios"]
//! technicals = ["tech5", "tech20", "tech60", "tech252"]
//! price = "historicalPriceFull.historical"
//!
//! [normalize]
//! exclude = ["symbol", "symbol_x", "symbol_y", "date_price", "date_info"]
//!
//! [output]
//! aligned_file = "data_to_csv.csv"
//! normalized_file = "data_to_csv_preprocessed.csv"
//!
//! [display]
//! max_rows = 20
//! max_columns = 12
//! ```

use fundalign_core::align::{RecoveryGranularity, UnmappedPeriodPolicy};
use fundalign_core::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reproduce one alignment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Symbol stamped onto the price rows.
    pub symbol: String,
    /// JSON document holding every section.
    pub input: PathBuf,
    /// Directory the CSV artifacts are written to.
    pub output_dir: PathBuf,
    pub unmapped_periods: UnmappedPeriodPolicy,
    pub recovery: RecoveryGranularity,
    pub sections: SectionConfig,
    pub normalize: NormalizeConfig,
    pub output: OutputConfig,
    pub display: DisplayOptions,
}

/// Where each table lives inside the input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Quarterly topics, merged in this order.
    pub fundamentals: Vec<String>,
    /// Indicator windows; the section name doubles as the column suffix.
    pub technicals: Vec<String>,
    /// Dotted path to the daily price records.
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Identifier columns never scaled.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub aligned_file: String,
    pub normalized_file: String,
}

/// How much of a table the CLI prints. Never read by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub max_rows: usize,
    pub max_columns: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbol: "1101.TW".to_string(),
            input: PathBuf::from("output_clean_date_technical.json"),
            output_dir: PathBuf::from("."),
            unmapped_periods: UnmappedPeriodPolicy::default(),
            recovery: RecoveryGranularity::default(),
            sections: SectionConfig::default(),
            normalize: NormalizeConfig::default(),
            output: OutputConfig::default(),
            display: DisplayOptions::default(),
        }
    }
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            fundamentals: [
                "balanceSheetStatementGrowth",
                "cashFlowStatementGrowth",
                "incomeStatementGrowth",
                "financialGrowth",
                "ratios",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            technicals: ["tech5", "tech20", "tech60", "tech252"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            price: "historicalPriceFull.historical".to_string(),
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            exclude: ["symbol", "symbol_x", "symbol_y", "date_price", "date_info"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            aligned_file: "data_to_csv.csv".to_string(),
            normalized_file: "data_to_csv_preprocessed.csv".to_string(),
        }
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            max_rows: 20,
            max_columns: 12,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if self.sections.fundamentals.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one fundamentals section is required".into(),
            ));
        }
        if self.sections.price.trim().is_empty() {
            return Err(ConfigError::Invalid("price section path must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for window in &self.sections.technicals {
            if !seen.insert(window.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "technical window '{window}' listed twice"
                )));
            }
        }
        if self.output.aligned_file == self.output.normalized_file {
            return Err(ConfigError::Invalid(
                "aligned and normalized outputs must use different file names".into(),
            ));
        }
        Ok(())
    }

    /// Pipeline switches derived from this config.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            symbol: self.symbol.clone(),
            unmapped_periods: self.unmapped_periods,
            recovery: self.recovery,
        }
    }

    pub fn aligned_path(&self) -> PathBuf {
        self.output_dir.join(&self.output.aligned_file)
    }

    pub fn normalized_path(&self) -> PathBuf {
        self.output_dir.join(&self.output.normalized_file)
    }

    /// Deterministic hash of this config. Two runs with the same config hash
    /// and the same input document produce the same output.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)
            .map_err(|e| ConfigError::Invalid(format!("config serialization failed: {e}")))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.sections.fundamentals.len(), 5);
        assert_eq!(config.sections.technicals, ["tech5", "tech20", "tech60", "tech252"]);
        assert_eq!(config.unmapped_periods, UnmappedPeriodPolicy::Fail);
        assert_eq!(config.recovery, RecoveryGranularity::StartDate);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = PipelineConfig::from_toml(
            r#"
            symbol = "2330.TW"
            unmapped_periods = "drop"
            recovery = "identity_key"

            [sections]
            technicals = ["tech5"]

            [display]
            max_rows = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.symbol, "2330.TW");
        assert_eq!(config.unmapped_periods, UnmappedPeriodPolicy::Drop);
        assert_eq!(config.recovery, RecoveryGranularity::IdentityKey);
        assert_eq!(config.sections.technicals, ["tech5"]);
        assert_eq!(config.sections.fundamentals.len(), 5);
        assert_eq!(config.sections.price, "historicalPriceFull.historical");
        assert_eq!(config.display.max_rows, 5);
        assert_eq!(config.display.max_columns, 12);
    }

    #[test]
    fn rejects_duplicate_window() {
        let err = PipelineConfig::from_toml(
            r#"
            [sections]
            technicals = ["tech5", "tech5"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("tech5")));
    }

    #[test]
    fn rejects_empty_symbol() {
        let err = PipelineConfig::from_toml(r#"symbol = "  ""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = PipelineConfig::from_toml(r#"unmapped_periods = "ignore""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn output_paths_join_output_dir() {
        let mut config = PipelineConfig::default();
        config.output_dir = PathBuf::from("out");
        assert_eq!(config.aligned_path(), PathBuf::from("out/data_to_csv.csv"));
        assert_eq!(
            config.normalized_path(),
            PathBuf::from("out/data_to_csv_preprocessed.csv")
        );
    }

    #[test]
    fn config_hash_is_deterministic_and_sensitive() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());

        b.recovery = RecoveryGranularity::IdentityKey;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }

    #[test]
    fn pipeline_options_carry_symbol_and_policies() {
        let mut config = PipelineConfig::default();
        config.unmapped_periods = UnmappedPeriodPolicy::Drop;
        let options = config.pipeline_options();
        assert_eq!(options.symbol, "1101.TW");
        assert_eq!(options.unmapped_periods, UnmappedPeriodPolicy::Drop);
    }
}
