//! Run configuration
//!
//! Every setting has a default that reproduces the classic layout: an `id`
//! join key, a `categories` column, comma-delimited files and a `Message`
//! output table. Values are resolved in this order, later sources winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, else `etl.toml` in the working directory)
//! 3. `ETL_TABLE_NAME`, `ETL_LOG_DIR`, `ETL_LOG_LEVEL`
//! 4. command line flags, applied by the binary
//!
//! ```toml
//! table_name = "Message"
//! delimiter = ","
//!
//! [logging]
//! dir = "logs"
//! level = "info"
//! ```

use crate::constants::*;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub table_name: String,
    pub join_key: String,
    pub category_column: String,
    pub delimiter: char,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_name: String,
    pub level: String,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            join_key: DEFAULT_JOIN_KEY.to_string(),
            category_column: DEFAULT_CATEGORY_COLUMN.to_string(),
            delimiter: ',',
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_LOG_DIR.to_string(),
            file_name: DEFAULT_LOG_FILE.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl EtlConfig {
    /// Resolve configuration: defaults, then the TOML file, then `ETL_*`
    /// environment variables.
    ///
    /// An explicit `path` must exist. Without one, `etl.toml` in the working
    /// directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay environment overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ETL_TABLE_NAME") {
            self.table_name = v;
        }
        if let Some(v) = lookup("ETL_LOG_DIR") {
            self.logging.dir = v;
        }
        if let Some(v) = lookup("ETL_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(EtlError::Config("table_name must not be empty".into()));
        }
        if self.join_key.is_empty() {
            return Err(EtlError::Config("join_key must not be empty".into()));
        }
        if self.category_column.is_empty() {
            return Err(EtlError::Config("category_column must not be empty".into()));
        }
        if self.join_key == self.category_column {
            return Err(EtlError::Config(format!(
                "join_key and category_column are both '{}'",
                self.join_key
            )));
        }
        self.delimiter_byte()?;
        Ok(())
    }

    /// Delimiter as the byte the CSV reader expects.
    ///
    /// Checked here as well as in [`EtlConfig::validate`], since callers may
    /// build a config by hand and pass it straight to the loader.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                EtlError::Config(format!(
                    "delimiter '{}' is not a single ASCII character",
                    self.delimiter
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_original_layout() {
        let config = EtlConfig::default();
        assert_eq!(config.table_name, "Message");
        assert_eq!(config.join_key, "id");
        assert_eq!(config.category_column, "categories");
        assert_eq!(config.delimiter_byte().unwrap(), b',');
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EtlConfig::from_toml_str(
            r#"
            table_name = "Cleaned"
            delimiter = ";"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.table_name, "Cleaned");
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.join_key, "id");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.dir, "logs");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [("ETL_TABLE_NAME", "Other"), ("ETL_LOG_DIR", "/tmp/etl-logs")]
                .into_iter()
                .collect();
        let mut config = EtlConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.table_name, "Other");
        assert_eq!(config.logging.dir, "/tmp/etl-logs");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EtlConfig::default();
        config.table_name = "  ".into();
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));

        let mut config = EtlConfig::default();
        config.category_column = "id".into();
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));

        let mut config = EtlConfig::default();
        config.delimiter = 'é';
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_delimiter_byte_rejects_non_ascii_without_validate() {
        let config = EtlConfig {
            delimiter: 'Ĭ',
            ..EtlConfig::default()
        };
        assert!(matches!(config.delimiter_byte(), Err(EtlError::Config(_))));

        let config = EtlConfig {
            delimiter: '\t',
            ..EtlConfig::default()
        };
        assert_eq!(config.delimiter_byte().unwrap(), b'\t');
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = EtlConfig::load(Some(Path::new("/nonexistent/etl.toml"))).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
