//! CLI error type and exit codes

use olist_dw_core::clean::CleanError;
use olist_dw_core::pipeline::PipelineError;
use olist_dw_core::quality::QualityError;
use olist_dw_core::storage::StorageError;
use olist_dw_core::warehouse::WarehouseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Clean(#[from] CleanError),

    #[error(transparent)]
    Quality(#[from] QualityError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Output error: {0}")]
    OutputError(String),

    /// Only raised by `validate --strict`
    #[error("{0} quality check(s) failed")]
    ChecksFailed(usize),
}

impl CliError {
    /// Process exit code: 2 for failed checks in strict mode, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ChecksFailed(_) => 2,
            _ => 1,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CliError::ConfigError(msg) => format!(
                "Configuration error: {msg}\n\nHint: Check --config, the MINIO_*/PG_* environment variables and the command-line flags."
            ),
            CliError::Pipeline(e) => e.user_message(),
            CliError::Clean(e) => e.user_message(),
            CliError::Quality(e) => e.user_message(),
            CliError::Storage(e) => e.user_message(),
            CliError::Warehouse(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::ChecksFailed(3).exit_code(), 2);
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), 1);
        assert_eq!(
            CliError::Warehouse(WarehouseError::NotInitialized("olist_dw".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_user_message_keeps_hints() {
        let err = CliError::Warehouse(WarehouseError::NotInitialized("olist_dw".into()));
        assert!(err.user_message().contains("olist-dw init"));
    }
}
