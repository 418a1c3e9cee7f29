use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{BatchError, core::executor::default_pool_size};

/// Photo API queried when no base URL is configured.
pub const DEFAULT_ENRICHMENT_BASE_URL: &str = "https://jsonplaceholder.typicode.com/photos";

/// Settings of the client import pipeline.
///
/// Every field has a default, so a configuration file only needs the values
/// it changes. Keys are camelCase:
///
/// ```json
/// { "chunkSize": 500, "poolSize": 8, "skipMalformedLines": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub pool_size: usize,
    pub source_path: String,
    pub field_names: Vec<String>,
    pub comment_prefix: String,
    pub delimiter: char,
    /// Skip and log malformed lines instead of failing the step.
    pub skip_malformed_lines: bool,
    /// Maximum wait for a free worker, unbounded when absent.
    pub pool_max_wait_ms: Option<u64>,
    pub enrichment_base_url: String,
    pub enrichment_timeout_ms: u64,
    /// Where the commit cursor is persisted; no resume support when absent.
    pub checkpoint_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            pool_size: default_pool_size(),
            source_path: "files/person.csv".to_string(),
            field_names: ["name", "email", "birthDay", "age", "id"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            comment_prefix: "--".to_string(),
            delimiter: ',',
            skip_malformed_lines: false,
            pool_max_wait_ms: None,
            enrichment_base_url: DEFAULT_ENRICHMENT_BASE_URL.to_string(),
            enrichment_timeout_ms: 5000,
            checkpoint_path: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|error| BatchError::Configuration(format!("{}: {}", path.display(), error)))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|error| BatchError::Configuration(format!("{}: {}", path.display(), error)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration("chunkSize must be greater than zero".to_string()));
        }
        if self.pool_size == 0 {
            return Err(BatchError::Configuration("poolSize must be greater than zero".to_string()));
        }
        if self.field_names.is_empty() {
            return Err(BatchError::Configuration("fieldNames must not be empty".to_string()));
        }
        if !self.delimiter.is_ascii() {
            return Err(BatchError::Configuration("delimiter must be an ASCII character".to_string()));
        }
        Ok(())
    }

    /// Number of malformed lines a step tolerates.
    pub fn skip_limit(&self) -> usize {
        if self.skip_malformed_lines {
            usize::MAX
        } else {
            0
        }
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    pub fn pool_max_wait(&self) -> Option<Duration> {
        self.pool_max_wait_ms.map(Duration::from_millis)
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "chunkSize": 250, "skipMalformedLines": true }"#).unwrap();

        let config = PipelineConfig::from_path(&path).unwrap();

        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.skip_limit(), usize::MAX);
        assert_eq!(config.comment_prefix, "--");
        assert_eq!(config.field_names, vec!["name", "email", "birthDay", "age", "id"]);
        assert_eq!(config.delimiter_byte(), b',');
        assert_eq!(config.pool_max_wait(), None);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "chunkSize": 0 }"#).unwrap();

        assert!(matches!(
            PipelineConfig::from_path(&path),
            Err(BatchError::Configuration(_))
        ));
    }

    #[test]
    fn empty_field_names_are_rejected() {
        let config = PipelineConfig {
            field_names: Vec::new(),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();

        config.validate().unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.skip_limit(), 0);
        assert_eq!(config.enrichment_timeout(), Duration::from_secs(5));
    }
}
