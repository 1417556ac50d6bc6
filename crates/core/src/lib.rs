//! Olist DW Core - batch ETL for the e-commerce warehouse
//!
//! Provides:
//! - Raw extract cleaning into the silver layer (`clean`)
//! - Cross-entity data-quality validation (`quality`)
//! - Star-schema loading with surrogate keys (`warehouse`)
//! - Sequential stage orchestration (`pipeline`)
//! - Blob storage backends for the raw and silver layers (`storage`)

pub mod clean;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod quality;
pub mod storage;
pub mod tabular;
pub mod warehouse;

// Re-export commonly used types
pub use clean::{CleanError, CleanStats, Cleaner, Entity};
pub use config::{PipelineConfig, StorageConfig, StorageLocation, WarehouseConfig};
pub use pipeline::{PipelineError, PipelineExecutor, PipelineReport, PipelineStage};
pub use quality::{CheckResult, CheckStatus, QualityEngine, QualityReport, SilverTables};
pub use storage::{BlobStore, LocalBlobStore, StorageError};
pub use warehouse::{LoadStats, WarehouseError, WarehouseSink};
