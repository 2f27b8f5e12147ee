//! Configuration for parsing, validation and reporting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CasebookError, Result};
use crate::render::{Column, ReportFormat};
use crate::schema::Schema;

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1500;

/// Configuration parameters for a casebook run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CasebookConfig {
    /// Maximum chunk size in bytes for section-aware chunking.
    pub max_chunk_size: usize,
    /// Report front-matter fields the schema does not declare.
    pub strict_schema: bool,
    /// Columns used when a report does not ask for specific ones.
    pub default_columns: Vec<Column>,
    pub report_format: ReportFormat,
}

impl Default for CasebookConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            strict_schema: false,
            default_columns: Column::default_set(),
            report_format: ReportFormat::default(),
        }
    }
}

impl CasebookConfig {
    /// Create a new builder for constructing a [`CasebookConfig`].
    pub fn builder() -> CasebookConfigBuilder {
        CasebookConfigBuilder::default()
    }

    /// Load a JSON config file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CasebookError::Io`] if the file cannot be read and
    /// [`CasebookError::Config`] if it is not valid JSON or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| CasebookError::Io { path: path.to_path_buf(), source })?;
        let config: CasebookConfig = serde_json::from_str(&raw)
            .map_err(|e| CasebookError::Config(format!("{}: {e}", path.display())))?;
        CasebookConfigBuilder { config }.build()
    }

    /// The case-study schema with this config's strictness applied.
    pub fn schema(&self) -> Schema {
        Schema::case_study().with_strict(self.strict_schema)
    }
}

/// Builder for constructing a validated [`CasebookConfig`].
#[derive(Debug, Clone, Default)]
pub struct CasebookConfigBuilder {
    config: CasebookConfig,
}

impl CasebookConfigBuilder {
    /// Set the maximum chunk size in bytes.
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// Set whether undeclared front-matter fields are reported.
    pub fn strict_schema(mut self, strict: bool) -> Self {
        self.config.strict_schema = strict;
        self
    }

    /// Set the columns used when a report names none.
    pub fn default_columns(mut self, columns: Vec<Column>) -> Self {
        self.config.default_columns = columns;
        self
    }

    /// Set the default report format.
    pub fn report_format(mut self, format: ReportFormat) -> Self {
        self.config.report_format = format;
        self
    }

    /// Build the [`CasebookConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`CasebookError::Config`] if:
    /// - `max_chunk_size == 0`
    /// - `default_columns` is empty
    pub fn build(self) -> Result<CasebookConfig> {
        if self.config.max_chunk_size == 0 {
            return Err(CasebookError::Config(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.config.default_columns.is_empty() {
            return Err(CasebookError::Config("default_columns must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_inconsistent_values() {
        assert!(CasebookConfig::builder().max_chunk_size(0).build().is_err());
        assert!(CasebookConfig::builder().default_columns(Vec::new()).build().is_err());
        let config = CasebookConfig::builder()
            .strict_schema(true)
            .report_format(ReportFormat::Csv)
            .build()
            .unwrap();
        assert!(config.schema().strict);
        assert_eq!(config.report_format, ReportFormat::Csv);
    }

    #[test]
    fn json_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casebook.json");
        std::fs::write(&path, r#"{"report_format": "markdown", "default_columns": ["client"]}"#)
            .unwrap();
        let config = CasebookConfig::from_json_file(&path).unwrap();
        assert_eq!(config.report_format, ReportFormat::Markdown);
        assert_eq!(config.default_columns, vec![Column::Client]);
        assert_eq!(config.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);

        std::fs::write(&path, r#"{"max_chunk_size": 0}"#).unwrap();
        assert!(matches!(
            CasebookConfig::from_json_file(&path),
            Err(CasebookError::Config(_))
        ));
    }
}
