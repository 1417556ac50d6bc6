//! Pipeline executor for running the ETL stages in order

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::error::{PipelineError, PipelineResult, StageCause};
use super::stage::PipelineStage;
use crate::clean::{CleanStats, Cleaner, Entity};
use crate::config::PipelineConfig;
use crate::models::{
    SilverCustomer, SilverGeolocation, SilverOrder, SilverOrderItem, SilverPayment, SilverProduct,
    SilverReview, SilverSeller,
};
use crate::quality::{self, QualityEngine, QualityReport, SilverTables};
use crate::storage::BlobStore;
use crate::tabular::SilverDataset;
use crate::warehouse::{self, LoadStats, WarehouseError, WarehouseSink};

/// Paths of every silver dataset read by the validate and load stages
const SILVER_PATHS: [&str; 8] = [
    SilverOrder::PATH,
    SilverCustomer::PATH,
    SilverOrderItem::PATH,
    SilverProduct::PATH,
    SilverSeller::PATH,
    SilverPayment::PATH,
    SilverReview::PATH,
    SilverGeolocation::PATH,
];

/// Pipeline executor that runs the selected stages sequentially
pub struct PipelineExecutor {
    config: PipelineConfig,
    store: Box<dyn BlobStore>,
    warehouse: Option<Box<dyn WarehouseSink>>,
    engine: QualityEngine,
    run_id: String,
}

impl PipelineExecutor {
    /// Create a new pipeline executor
    ///
    /// A warehouse is required when a load stage is selected.
    pub fn new(
        config: PipelineConfig,
        store: Box<dyn BlobStore>,
        warehouse: Option<Box<dyn WarehouseSink>>,
    ) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;
        if config.needs_warehouse() && warehouse.is_none() {
            return Err(PipelineError::ConfigError(
                "A warehouse connection is required for the load stages".to_string(),
            ));
        }

        Ok(Self {
            config,
            store,
            warehouse,
            engine: QualityEngine::default(),
            run_id: Uuid::new_v4().to_string(),
        })
    }

    /// Replace the quality engine (tolerance, sample size)
    pub fn with_engine(mut self, engine: QualityEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Unique id of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run the pipeline
    pub async fn run(&self) -> PipelineResult<PipelineReport> {
        let span = info_span!(
            "pipeline_run",
            run_id = %self.run_id,
            dry_run = self.config.dry_run
        );
        self.run_stages().instrument(span).await
    }

    async fn run_stages(&self) -> PipelineResult<PipelineReport> {
        let start = Instant::now();
        let stages = self.config.effective_stages();

        info!(
            run_id = %self.run_id,
            stages = ?stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            store = %self.store.describe(),
            dry_run = self.config.dry_run,
            "Starting pipeline"
        );

        if self.config.verbose {
            eprintln!("Pipeline run: {}", self.run_id);
            eprintln!(
                "Stages to run: {:?}",
                stages.iter().map(|s| s.name()).collect::<Vec<_>>()
            );
            if self.config.dry_run {
                eprintln!("DRY RUN MODE - no changes will be made");
            }
        }

        let mut report = PipelineReport::new(&self.run_id);

        if self.config.dry_run {
            self.dry_run(&stages).await?;
            report.dry_run = true;
            report.status = PipelineStatus::Completed;
            return Ok(report);
        }

        for stage in &stages {
            let stage_start = Instant::now();
            let span = info_span!("pipeline_stage", stage = stage.name());
            info!(parent: &span, stage = stage.name(), "Starting stage");

            if self.config.verbose {
                eprintln!("Running stage {}...", stage.name());
            }

            match self.run_stage(*stage, &mut report).instrument(span).await {
                Ok(output) => {
                    let output = output.with_duration(stage_start.elapsed().as_millis() as u64);
                    info!(
                        stage = stage.name(),
                        duration_ms = output.duration_ms,
                        "Stage completed"
                    );
                    if self.config.verbose {
                        eprintln!(
                            "Stage {} completed in {}ms",
                            stage.name(),
                            output.duration_ms
                        );
                    }
                    report.stages_completed.push(*stage);
                    report.outputs.push(output);
                }
                Err(cause) => {
                    let err = PipelineError::stage_failure(stage.name(), cause);
                    error!(stage = stage.name(), error = %err, "Stage failed");
                    return Err(err);
                }
            }
        }

        report.status = PipelineStatus::Completed;
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %self.run_id,
            duration_ms = report.duration_ms,
            stages_completed = report.stages_completed.len(),
            "Pipeline completed"
        );

        Ok(report)
    }

    /// Run a single stage
    async fn run_stage(
        &self,
        stage: PipelineStage,
        report: &mut PipelineReport,
    ) -> Result<StageOutput, StageCause> {
        match stage {
            PipelineStage::Clean => self.run_clean(report).await,
            PipelineStage::Validate => self.run_validate(report).await,
            PipelineStage::LoadDimensions => self.run_load_dimensions(report).await,
            PipelineStage::LoadFacts => self.run_load_facts(report).await,
        }
    }

    /// Run the clean stage
    async fn run_clean(&self, report: &mut PipelineReport) -> Result<StageOutput, StageCause> {
        let stats = Cleaner::new(self.store.as_ref()).run_all().await?;

        let mut output = StageOutput::new(PipelineStage::Clean);
        for entity in &stats {
            output = output
                .with_files(entity.outputs.iter().map(|o| o.path.clone()))
                .with_metadata(
                    entity.entity.name(),
                    serde_json::json!({
                        "rows_read": entity.rows_read,
                        "rows_written": entity.rows_written(),
                        "rows_rejected": entity.rows_rejected,
                    }),
                );
            if self.config.verbose {
                eprintln!(
                    "  {}: {} rows ({} rejected)",
                    entity.entity,
                    entity.rows_written(),
                    entity.rows_rejected
                );
            }
        }

        report.cleaned = stats;
        Ok(output)
    }

    /// Run the validate stage
    async fn run_validate(&self, report: &mut PipelineReport) -> Result<StageOutput, StageCause> {
        let tables = SilverTables::load(self.store.as_ref()).await?;
        let quality_report = self.engine.run(&tables);
        quality_report.persist(self.store.as_ref()).await?;

        let failed: Vec<&str> = quality_report
            .failed()
            .map(|r| r.check_name.as_str())
            .collect();
        if !failed.is_empty() {
            warn!(failed = ?failed, "Quality checks failed");
        }

        let output = StageOutput::new(PipelineStage::Validate)
            .with_file(quality::REPORT_PATH)
            .with_metadata("checks", serde_json::json!(quality_report.results.len()))
            .with_metadata("failed", serde_json::json!(failed));

        report.quality = Some(quality_report);
        Ok(output)
    }

    /// Run the dimension loaders
    async fn run_load_dimensions(
        &self,
        report: &mut PipelineReport,
    ) -> Result<StageOutput, StageCause> {
        let sink = self.ready_warehouse().await?;
        let store = self.store.as_ref();

        let orders: Vec<SilverOrder> = quality::read_dataset(store).await?;
        let customers: Vec<SilverCustomer> = quality::read_dataset(store).await?;
        let sellers: Vec<SilverSeller> = quality::read_dataset(store).await?;
        let products: Vec<SilverProduct> = quality::read_dataset(store).await?;
        let geolocation: Vec<SilverGeolocation> = quality::read_dataset(store).await?;

        let loads = vec![
            warehouse::load_dim_date(sink, &orders).await?,
            warehouse::load_dim_customer(sink, &customers).await?,
            warehouse::load_dim_seller(sink, &sellers).await?,
            warehouse::load_dim_product(sink, &products).await?,
            warehouse::load_dim_geolocation(sink, &geolocation).await?,
        ];

        Ok(self.record_loads(PipelineStage::LoadDimensions, loads, report))
    }

    /// Run the fact loaders, orders first
    async fn run_load_facts(&self, report: &mut PipelineReport) -> Result<StageOutput, StageCause> {
        let sink = self.ready_warehouse().await?;
        let store = self.store.as_ref();

        let orders: Vec<SilverOrder> = quality::read_dataset(store).await?;
        let items: Vec<SilverOrderItem> = quality::read_dataset(store).await?;
        let payments: Vec<SilverPayment> = quality::read_dataset(store).await?;
        let reviews: Vec<SilverReview> = quality::read_dataset(store).await?;

        let loads = vec![
            warehouse::load_fact_orders(sink, &orders).await?,
            warehouse::load_fact_order_items(sink, &items).await?,
            warehouse::load_fact_payments(sink, &payments).await?,
            warehouse::load_fact_reviews(sink, &reviews).await?,
        ];

        Ok(self.record_loads(PipelineStage::LoadFacts, loads, report))
    }

    fn record_loads(
        &self,
        stage: PipelineStage,
        loads: Vec<LoadStats>,
        report: &mut PipelineReport,
    ) -> StageOutput {
        let mut output = StageOutput::new(stage);
        for load in &loads {
            output = output.with_metadata(
                &load.table,
                serde_json::json!({
                    "rows_in": load.rows_in,
                    "rows_written": load.rows_written,
                    "rows_skipped": load.rows_skipped,
                    "unresolved_keys": load.unresolved_keys,
                }),
            );
            if self.config.verbose {
                eprintln!("  {load}");
            }
        }
        report.loads.extend(loads);
        output
    }

    /// The warehouse, checked to be provisioned
    async fn ready_warehouse(&self) -> Result<&dyn WarehouseSink, WarehouseError> {
        let sink = self.warehouse.as_deref().ok_or_else(|| {
            WarehouseError::Connection("no warehouse configured".to_string())
        })?;
        if !sink.is_initialized().await? {
            return Err(WarehouseError::NotInitialized(sink.schema().to_string()));
        }
        debug!(warehouse = %sink.describe(), "Warehouse ready");
        Ok(sink)
    }

    /// Run in dry-run mode (validation only)
    async fn dry_run(&self, stages: &[PipelineStage]) -> PipelineResult<()> {
        let mut errors = Vec::new();

        for stage in stages {
            if let Err(e) = self.validate_stage(*stage, stages).await {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => {
                eprintln!("Dry run validation passed for all stages");
                Ok(())
            }
            1 => Err(errors.remove(0)),
            _ => Err(PipelineError::Multiple(errors)),
        }
    }

    /// Validate a stage's inputs
    async fn validate_stage(
        &self,
        stage: PipelineStage,
        selected: &[PipelineStage],
    ) -> PipelineResult<()> {
        let fail = |cause: StageCause| PipelineError::stage_failure(stage.name(), cause);

        let required: Vec<String> = match stage {
            PipelineStage::Clean => Entity::all().iter().map(Entity::raw_path).collect(),
            // Silver inputs only need to exist up front when clean is not part of the run
            _ if selected.contains(&PipelineStage::Clean) => Vec::new(),
            _ => SILVER_PATHS.iter().map(|p| p.to_string()).collect(),
        };

        let mut missing = Vec::new();
        for path in required {
            if !self.store.exists(&path).await.map_err(|e| fail(e.into()))? {
                missing.push(path);
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::MissingInput(missing.join(", ")));
        }

        if stage.uses_warehouse() {
            self.ready_warehouse().await.map_err(|e| fail(e.into()))?;
        }
        Ok(())
    }
}

/// Pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Pipeline is running
    Running,
    /// Pipeline completed successfully
    Completed,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Output from a pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: PipelineStage,
    /// Blob store paths written by the stage
    pub files: Vec<String>,
    /// Stage-specific metadata
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl StageOutput {
    pub fn new(stage: PipelineStage) -> Self {
        Self {
            stage,
            files: Vec::new(),
            metadata: BTreeMap::new(),
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Add an output file
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add multiple output files
    pub fn with_files(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.files.extend(paths);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set duration
    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Run ID
    pub run_id: String,
    /// Final status
    pub status: PipelineStatus,
    /// True when only inputs were checked
    pub dry_run: bool,
    /// Completed stages, in order
    pub stages_completed: Vec<PipelineStage>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Stage outputs, in order
    pub outputs: Vec<StageOutput>,
    /// Per-entity statistics of the clean stage
    pub cleaned: Vec<CleanStats>,
    /// Quality report of the validate stage
    pub quality: Option<QualityReport>,
    /// Per-table statistics of the load stages
    pub loads: Vec<LoadStats>,
}

impl PipelineReport {
    fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: PipelineStatus::Running,
            dry_run: false,
            stages_completed: Vec::new(),
            duration_ms: 0,
            outputs: Vec::new(),
            cleaned: Vec::new(),
            quality: None,
            loads: Vec::new(),
        }
    }

    /// Check if pipeline was successful
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Completed
    }

    /// Output of a completed stage
    pub fn output(&self, stage: PipelineStage) -> Option<&StageOutput> {
        self.outputs.iter().find(|o| o.stage == stage)
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Pipeline {} - {}", self.run_id, self.status);
        if self.dry_run {
            eprintln!("Dry run: inputs checked, nothing written");
            return;
        }
        eprintln!("Duration: {}", self.duration_formatted());
        eprintln!("Stages completed: {}", self.stages_completed.len());

        for output in &self.outputs {
            eprintln!("  - {}: ok ({}ms)", output.stage.name(), output.duration_ms);
        }
        if let Some(quality) = &self.quality {
            let failed = quality.failed().count();
            eprintln!(
                "Quality checks: {} passed, {} failed",
                quality.results.len() - failed,
                failed
            );
        }
    }
}
