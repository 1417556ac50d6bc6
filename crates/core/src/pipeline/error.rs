//! Error types for pipeline operations
//!
//! Component errors are wrapped with the stage they aborted, so the CLI can
//! name the stage and still show the component's own hint.

use thiserror::Error;

use crate::clean::CleanError;
use crate::quality::QualityError;
use crate::storage::StorageError;
use crate::warehouse::WarehouseError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Stage failed with underlying cause
    #[error("Stage '{stage}' failed: {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: StageCause,
    },

    /// Multiple errors occurred
    #[error("Multiple errors occurred: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<PipelineError>),
}

/// The component error behind a failed stage
#[derive(Error, Debug)]
pub enum StageCause {
    #[error(transparent)]
    Clean(#[from] CleanError),
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

impl StageCause {
    fn user_message(&self) -> String {
        match self {
            StageCause::Clean(e) => e.user_message(),
            StageCause::Quality(e) => e.user_message(),
            StageCause::Storage(e) => e.user_message(),
            StageCause::Warehouse(e) => e.user_message(),
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a stage failure with underlying error
    pub fn stage_failure(stage: impl Into<String>, source: impl Into<StageCause>) -> Self {
        Self::StageFailure {
            stage: stage.into(),
            source: source.into(),
        }
    }

    /// Get the stage name if this is a stage error
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailure { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!(
                    "Configuration error: {msg}\n\nHint: Check your configuration file, environment and flags."
                )
            }
            PipelineError::MissingInput(input) => {
                format!(
                    "Missing required input: {input}\n\nHint: Run the earlier stages first or upload the raw extracts."
                )
            }
            PipelineError::StageFailure { stage, source } => {
                format!("Stage '{stage}' failed: {}", source.user_message())
            }
            PipelineError::Multiple(errors) => errors
                .iter()
                .map(PipelineError::user_message)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::MissingInput("raw/olist_orders_dataset.csv".to_string());
        assert!(err.to_string().contains("olist_orders_dataset"));
    }

    #[test]
    fn test_stage_failure() {
        let err = PipelineError::stage_failure(
            "clean",
            CleanError::SourceMissing {
                path: "raw/olist_orders_dataset.csv".to_string(),
            },
        );
        assert!(err.to_string().contains("clean"));
        assert_eq!(err.stage_name(), Some("clean"));
        assert!(err.user_message().contains("Hint:"));
    }

    #[test]
    fn test_warehouse_hint_survives_wrapping() {
        let err = PipelineError::stage_failure(
            "load-facts",
            WarehouseError::NotInitialized("olist_dw".to_string()),
        );
        assert!(err.user_message().contains("olist-dw init"));
    }

    #[test]
    fn test_multiple_errors() {
        let errors = vec![
            PipelineError::MissingInput("error 1".to_string()),
            PipelineError::ConfigError("error 2".to_string()),
        ];
        let err = PipelineError::Multiple(errors);
        let display = err.to_string();
        assert!(display.contains("error 1"));
        assert!(display.contains("error 2"));
    }
}
