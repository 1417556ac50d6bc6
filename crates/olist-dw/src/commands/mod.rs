//! CLI command implementations

pub mod clean;
pub mod init;
pub mod load;
pub mod report;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use olist_dw_core::config::{PipelineConfig, StorageLocation};
use tracing::debug;

use crate::error::CliError;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML configuration file
    pub config_file: Option<PathBuf>,
    /// Local directory holding `raw/` and `silver/`
    pub data_dir: Option<PathBuf>,
    /// S3 / MinIO bucket holding `raw/` and `silver/`
    pub bucket: Option<String>,
    /// Warehouse connection URL
    pub warehouse: Option<String>,
    /// Warehouse schema
    pub schema: Option<String>,
    pub verbose: bool,
}

/// Build the configuration from defaults, the config file, the environment
/// and finally the command-line flags
pub fn resolve_config(global: &GlobalArgs) -> Result<PipelineConfig, CliError> {
    resolve_config_with(global, |key| std::env::var(key).ok())
}

fn resolve_config_with<F>(global: &GlobalArgs, lookup: F) -> Result<PipelineConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match &global.config_file {
        Some(path) => PipelineConfig::from_toml_file(path).map_err(CliError::ConfigError)?,
        None => PipelineConfig::new(),
    };
    let mut config = config
        .with_env_from(lookup)
        .map_err(CliError::ConfigError)?
        .with_verbose(global.verbose);

    match (&global.data_dir, &global.bucket) {
        (Some(_), Some(_)) => {
            return Err(CliError::InvalidArgument(
                "--data-dir and --bucket are mutually exclusive".to_string(),
            ));
        }
        (Some(dir), None) => config.storage.location = StorageLocation::Local(dir.clone()),
        (None, Some(bucket)) => {
            config.storage.location =
                StorageLocation::parse(&format!("s3://{bucket}")).map_err(CliError::InvalidArgument)?
        }
        (None, None) => {}
    }
    if let Some(url) = &global.warehouse {
        config.warehouse.url = url.clone();
    }
    if let Some(schema) = &global.schema {
        config.warehouse.schema = schema.clone();
    }

    config.validate().map_err(CliError::ConfigError)?;
    debug!(?config, "Resolved configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_flags_override_environment() {
        let global = GlobalArgs {
            data_dir: Some(PathBuf::from("/data/olist")),
            schema: Some("analytics".to_string()),
            ..Default::default()
        };
        let config =
            resolve_config_with(&global, env(&[("MINIO_BUCKET", "other"), ("PG_SCHEMA", "dw")]))
                .unwrap();

        assert_eq!(
            config.storage.location,
            StorageLocation::Local(PathBuf::from("/data/olist"))
        );
        assert_eq!(config.warehouse.schema, "analytics");
    }

    #[test]
    fn test_environment_applies_without_flags() {
        let config = resolve_config_with(
            &GlobalArgs::default(),
            env(&[("PG_URL", "duckdb://dw.duckdb"), ("MINIO_BUCKET", "landing")]),
        )
        .unwrap();

        assert_eq!(config.warehouse.url, "duckdb://dw.duckdb");
        assert_eq!(
            config.storage.location,
            StorageLocation::S3 {
                bucket: "landing".to_string()
            }
        );
    }

    #[test]
    fn test_config_file_is_read_first() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("olist.toml");
        std::fs::write(
            &path,
            "[warehouse]\nurl = \"duckdb://from-file.duckdb\"\nbatch_size = 50\n",
        )
        .unwrap();
        let global = GlobalArgs {
            config_file: Some(path),
            warehouse: Some(":memory:".to_string()),
            ..Default::default()
        };

        let config = resolve_config_with(&global, env(&[])).unwrap();
        assert_eq!(config.warehouse.url, ":memory:");
        assert_eq!(config.warehouse.batch_size, 50);
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let global = GlobalArgs {
            schema: Some("drop table;".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config_with(&global, env(&[])),
            Err(CliError::ConfigError(_))
        ));
    }

    #[test]
    fn test_data_dir_and_bucket_conflict() {
        let global = GlobalArgs {
            data_dir: Some(PathBuf::from("data")),
            bucket: Some("e-commerce".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config_with(&global, env(&[])),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
