use config::{Config, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageConfig,
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint (MinIO, localstack). Real AWS when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_key_root")]
    pub key_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            key_root: default_key_root(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    #[serde(default = "default_warehouse_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub schema: String,
    #[serde(default = "default_fact_table")]
    pub fact_table: String,
    #[serde(default = "default_dimension_table")]
    pub dimension_table: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: u32,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default = "default_combined_filename")]
    pub combined_filename: String,
    #[serde(default)]
    pub consume: ConsumePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon_hours: default_horizon_hours(),
            staging_dir: default_staging_dir(),
            file_extension: default_file_extension(),
            combined_filename: default_combined_filename(),
            consume: ConsumePolicy::default(),
        }
    }
}

/// What happens to a staged source file once it has been folded into the
/// combined artifact.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ConsumePolicy {
    #[default]
    Delete,
    Archive { archive_dir: PathBuf },
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_bucket() -> String {
    "sigma-resources-truck".to_string()
}

fn default_region() -> String {
    "eu-west-2".to_string()
}

fn default_key_root() -> String {
    "trucks".to_string()
}

fn default_warehouse_port() -> u16 {
    5439
}

fn default_fact_table() -> String {
    "FACT_Transaction".to_string()
}

fn default_dimension_table() -> String {
    "DIM_Payment_Method".to_string()
}

fn default_horizon_hours() -> u32 {
    3
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_file_extension() -> String {
    ".csv".to_string()
}

fn default_combined_filename() -> String {
    "combined_data.csv".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

impl Settings {
    pub fn new(path: &str) -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("TRUCK_ETL").separator("__"));

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            bucket = %settings.storage.bucket,
            host = %settings.warehouse.host,
            schema = %settings.warehouse.schema,
            horizon_hours = settings.pipeline.horizon_hours,
            "Loaded settings"
        );

        Ok(settings)
    }

    /// Checks the values that end up spliced into SQL text.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.warehouse.schema)?;
        validate_identifier(&self.warehouse.fact_table)?;
        validate_identifier(&self.warehouse.dimension_table)?;
        if self.pipeline.horizon_hours == 0 {
            return Err(Error::InvalidInput(
                "pipeline.horizon_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accepts plain SQL identifiers only: a letter or underscore followed by
/// letters, digits or underscores.
pub fn validate_identifier(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(ident.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("analytics").is_ok());
        assert!(validate_identifier("FACT_Transaction").is_ok());
        assert!(validate_identifier("_staging2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("public; DROP TABLE x").is_err());
    }

    #[test]
    fn test_settings_from_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[warehouse]
host = "localhost"
database = "trucks"
username = "etl"
password = "secret"
schema = "analytics"
"#
        )
        .unwrap();

        let settings = Settings::new(file.path().to_str().unwrap()).unwrap();

        assert_eq!(settings.storage.bucket, "sigma-resources-truck");
        assert_eq!(settings.storage.key_root, "trucks");
        assert_eq!(settings.warehouse.port, 5439);
        assert_eq!(settings.warehouse.fact_table, "FACT_Transaction");
        assert_eq!(settings.pipeline.horizon_hours, 3);
        assert_eq!(settings.pipeline.combined_filename, "combined_data.csv");
        assert_eq!(settings.pipeline.consume, ConsumePolicy::Delete);
        assert_eq!(settings.retry.max_retries, 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_archive_policy_parses() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[warehouse]
host = "localhost"
database = "trucks"
username = "etl"
password = "secret"
schema = "analytics"

[pipeline]
horizon_hours = 5
consume = {{ policy = "archive", archive_dir = "archive" }}
"#
        )
        .unwrap();

        let settings = Settings::new(file.path().to_str().unwrap()).unwrap();

        assert_eq!(settings.pipeline.horizon_hours, 5);
        assert_eq!(
            settings.pipeline.consume,
            ConsumePolicy::Archive {
                archive_dir: PathBuf::from("archive")
            }
        );
    }
}
