//! Batch pipeline orchestration
//!
//! Runs the ETL stages strictly in order, each to completion before the next:
//!
//! 1. **Clean**: raw CSV extracts into silver Parquet datasets
//! 2. **Validate**: cross-entity quality checks, report persisted under `silver/reports/`
//! 3. **Load dimensions**: surrogate-key upserts of the warehouse dimensions
//! 4. **Load facts**: insert-once facts, orders first
//!
//! # Example
//!
//! ```rust,ignore
//! use olist_dw_core::config::{PipelineConfig, StorageConfig, WarehouseConfig};
//! use olist_dw_core::pipeline::{PipelineStage, run_pipeline};
//!
//! let config = PipelineConfig::new()
//!     .with_storage(StorageConfig::local("./lake"))
//!     .with_warehouse(WarehouseConfig::new("duckdb://olist.duckdb"))
//!     .with_stages(vec![PipelineStage::Clean, PipelineStage::Validate]);
//!
//! let report = run_pipeline(config).await?;
//! println!("Pipeline completed in {}", report.duration_formatted());
//! ```
//!
//! # Re-running
//!
//! There is no checkpoint. A failed run is retried from the start of the
//! failed stage by selecting it; cleaning is idempotent and loading is
//! upsert or insert-once, so re-runs are safe.
//!
//! # Dry Run
//!
//! With `dry_run` set, the executor only checks that every input of the
//! selected stages exists and that the warehouse is provisioned.

mod error;
mod executor;
mod stage;

pub use error::{PipelineError, PipelineResult, StageCause};
pub use executor::{PipelineExecutor, PipelineReport, PipelineStatus, StageOutput};
pub use stage::PipelineStage;

use crate::config::PipelineConfig;
use crate::{storage, warehouse};

/// Run a pipeline with the given configuration
///
/// Opens the blob store and, when a load stage is selected, the warehouse.
pub async fn run_pipeline(config: PipelineConfig) -> PipelineResult<PipelineReport> {
    let store = storage::open(&config.storage)
        .await
        .map_err(|e| PipelineError::stage_failure("connect", e))?;
    let sink = if config.needs_warehouse() {
        Some(
            warehouse::connect(&config.warehouse)
                .await
                .map_err(|e| PipelineError::stage_failure("connect", e))?,
        )
    } else {
        None
    };

    PipelineExecutor::new(config, store, sink)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, WarehouseConfig};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_pipeline_dry_run() {
        let temp = TempDir::new().unwrap();
        let raw = temp.path().join("raw");
        std::fs::create_dir(&raw).unwrap();
        for entity in crate::clean::Entity::all() {
            std::fs::write(raw.join(entity.raw_file()), "id\n").unwrap();
        }

        let config = PipelineConfig::new()
            .with_storage(StorageConfig::local(temp.path()))
            .with_warehouse(WarehouseConfig::new(":memory:"))
            .with_dry_run(true)
            .with_stages(vec![PipelineStage::Clean]);

        let report = run_pipeline(config).await.unwrap();
        assert!(report.is_success());
        assert!(report.dry_run);
        assert!(report.stages_completed.is_empty());
    }
}
