use crate::constants::{
    DEFAULT_CEREAL_URL, DEFAULT_TABLE_NAME, DEFAULT_WAREHOUSE_PATH, NORMALIZED_COLUMNS,
    SERVING_SIZE_COLUMN,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::steps::normalize::NormalizationSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub warehouse: WarehouseConfig,
    pub normalize: NormalizeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub url: String,
    /// No timeout when unset; a stalled server blocks the run.
    pub timeout_seconds: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CEREAL_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub conn_str: String,
    pub table: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            conn_str: DEFAULT_WAREHOUSE_PATH.to_string(),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub columns: Vec<String>,
    pub divisor_column: String,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            columns: NORMALIZED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            divisor_column: SERVING_SIZE_COLUMN.to_string(),
        }
    }
}

impl NormalizeConfig {
    pub fn spec(&self) -> NormalizationSpec {
        NormalizationSpec::new(self.columns.clone(), self.divisor_column.clone())
    }
}

impl PipelineConfig {
    /// Loads the TOML file at `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.url.trim().is_empty() {
            return Err(PipelineError::Config("fetch.url must not be empty".to_string()));
        }
        if self.warehouse.table.trim().is_empty() {
            return Err(PipelineError::Config("warehouse.table must not be empty".to_string()));
        }
        if self.normalize.divisor_column.trim().is_empty() {
            return Err(PipelineError::Config(
                "normalize.divisor_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.fetch.url, DEFAULT_CEREAL_URL);
        assert_eq!(config.warehouse.table, "normalized_cereals");
        assert_eq!(config.normalize.columns.len(), 10);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = PipelineConfig::from_toml(
            r#"
            [fetch]
            url = "http://localhost:8080/cereal.csv"
            timeout_seconds = 5

            [normalize]
            columns = ["calories"]
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.url, "http://localhost:8080/cereal.csv");
        assert_eq!(config.fetch.timeout_seconds, Some(5));
        assert_eq!(config.normalize.columns, vec!["calories"]);
        assert_eq!(config.normalize.divisor_column, "cups");
        assert_eq!(config.warehouse.conn_str, "cereals.db");
    }

    #[test]
    fn test_rejects_empty_url() {
        let err = PipelineConfig::from_toml("[fetch]\nurl = \"\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
