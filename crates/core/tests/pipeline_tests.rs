//! End-to-end pipeline runs over a local store and a DuckDB file

#![cfg(feature = "duckdb-backend")]

mod common;

use std::path::Path;

use olist_dw_core::config::{PipelineConfig, StorageConfig, WarehouseConfig};
use olist_dw_core::pipeline::{PipelineError, PipelineExecutor, PipelineReport, PipelineStage};
use olist_dw_core::quality::{CheckId, REPORT_PATH};
use olist_dw_core::storage::{BlobStore, LocalBlobStore};
use olist_dw_core::warehouse::schema::{DIM_CUSTOMER, FACT_ORDERS, FACT_REVIEWS};
use olist_dw_core::warehouse::{DuckDbWarehouse, WarehouseSink};
use tempfile::TempDir;

const SCHEMA: &str = "olist_dw";

fn config(root: &Path, stages: Vec<PipelineStage>) -> PipelineConfig {
    let url = format!("duckdb://{}", root.join("olist.duckdb").display());
    PipelineConfig::new()
        .with_storage(StorageConfig::local(root))
        .with_warehouse(WarehouseConfig::new(url))
        .with_stages(stages)
}

async fn provisioned_warehouse(root: &Path) -> DuckDbWarehouse {
    let dw = DuckDbWarehouse::open(&root.join("olist.duckdb"), SCHEMA).unwrap();
    dw.init().await.unwrap();
    dw
}

async fn run(config: PipelineConfig, root: &Path) -> Result<PipelineReport, PipelineError> {
    let store = Box::new(LocalBlobStore::new(root));
    let sink: Option<Box<dyn WarehouseSink>> = if config.needs_warehouse() {
        Some(Box::new(provisioned_warehouse(root).await))
    } else {
        None
    };
    PipelineExecutor::new(config, store, sink)?.run().await
}

#[tokio::test]
async fn test_full_pipeline_run() {
    let temp = TempDir::new().unwrap();
    common::write_raw_layer(temp.path());

    let report = run(config(temp.path(), Vec::new()), temp.path()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.stages_completed, PipelineStage::all());
    assert_eq!(report.cleaned.len(), 8);
    assert_eq!(report.loads.len(), 9);

    // failed checks are findings, loading still happens
    let quality = report.quality.as_ref().unwrap();
    assert!(!quality.get(CheckId::OrderItemsSellerFk).unwrap().passed());

    let store = LocalBlobStore::new(temp.path());
    assert!(store.exists(REPORT_PATH).await.unwrap());

    let dw = DuckDbWarehouse::open(&temp.path().join("olist.duckdb"), SCHEMA).unwrap();
    assert_eq!(dw.row_count(&FACT_ORDERS).await.unwrap(), 3);
    assert_eq!(dw.row_count(&FACT_REVIEWS).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let temp = TempDir::new().unwrap();
    common::write_raw_layer(temp.path());

    let first = run(config(temp.path(), Vec::new()), temp.path()).await.unwrap();
    let dw = DuckDbWarehouse::open(&temp.path().join("olist.duckdb"), SCHEMA).unwrap();
    let customer_keys = dw.key_map(&DIM_CUSTOMER).await.unwrap();
    drop(dw);

    let second = run(config(temp.path(), Vec::new()), temp.path()).await.unwrap();

    let hashes = |report: &PipelineReport| -> Vec<String> {
        report
            .cleaned
            .iter()
            .flat_map(|s| s.outputs.iter().map(|o| o.sha256.clone()))
            .collect()
    };
    assert_eq!(hashes(&first), hashes(&second));
    assert_ne!(first.run_id, second.run_id);

    let dw = DuckDbWarehouse::open(&temp.path().join("olist.duckdb"), SCHEMA).unwrap();
    assert_eq!(dw.key_map(&DIM_CUSTOMER).await.unwrap(), customer_keys);
    assert_eq!(dw.row_count(&FACT_ORDERS).await.unwrap(), 3);
}

#[tokio::test]
async fn test_selected_stages_run_in_pipeline_order() {
    let temp = TempDir::new().unwrap();
    common::write_raw_layer(temp.path());

    let config = config(
        temp.path(),
        vec![PipelineStage::Validate, PipelineStage::Clean],
    );
    let report = run(config, temp.path()).await.unwrap();

    assert_eq!(
        report.stages_completed,
        vec![PipelineStage::Clean, PipelineStage::Validate]
    );
    assert!(report.loads.is_empty());
    assert!(!temp.path().join("olist.duckdb").exists());
}

#[tokio::test]
async fn test_missing_raw_source_fails_clean_stage() {
    let temp = TempDir::new().unwrap();
    common::write_raw_layer(temp.path());
    std::fs::remove_file(temp.path().join("raw/olist_sellers_dataset.csv")).unwrap();

    let err = run(config(temp.path(), vec![PipelineStage::Clean]), temp.path())
        .await
        .unwrap_err();

    assert_eq!(err.stage_name(), Some("clean"));
    assert!(err.to_string().contains("olist_sellers_dataset.csv"));
}

#[tokio::test]
async fn test_load_requires_provisioned_warehouse() {
    let temp = TempDir::new().unwrap();
    common::write_raw_layer(temp.path());
    run(config(temp.path(), vec![PipelineStage::Clean]), temp.path())
        .await
        .unwrap();

    let config = config(temp.path(), vec![PipelineStage::LoadDimensions]);
    let store = Box::new(LocalBlobStore::new(temp.path()));
    let sink = DuckDbWarehouse::memory(SCHEMA).unwrap();
    let executor = PipelineExecutor::new(config, store, Some(Box::new(sink))).unwrap();

    let err = executor.run().await.unwrap_err();
    assert_eq!(err.stage_name(), Some("load-dimensions"));
    assert!(err.user_message().contains("olist-dw init"));
    match err {
        PipelineError::StageFailure { source, .. } => {
            assert!(source.to_string().contains(SCHEMA));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_dry_run_checks_inputs_without_writing() {
    let temp = TempDir::new().unwrap();
    common::write_raw_layer(temp.path());

    let report = run(config(temp.path(), Vec::new()).with_dry_run(true), temp.path())
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(report.dry_run);
    assert!(report.outputs.is_empty());
    assert!(!temp.path().join("silver").exists());
}

#[tokio::test]
async fn test_dry_run_without_silver_layer_fails_validate() {
    let temp = TempDir::new().unwrap();

    let err = run(
        config(temp.path(), vec![PipelineStage::Validate]).with_dry_run(true),
        temp.path(),
    )
    .await
    .unwrap_err();

    match err {
        PipelineError::MissingInput(paths) => assert!(paths.contains("silver/orders.parquet")),
        other => panic!("unexpected error: {other}"),
    }
}
