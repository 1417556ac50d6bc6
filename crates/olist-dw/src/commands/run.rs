//! The `run` command

use olist_dw_core::config::PipelineConfig;
use olist_dw_core::pipeline::{PipelineReport, PipelineStage, run_pipeline};
use tracing::info;

use crate::error::CliError;
use crate::output;

/// Arguments for the `run` command
pub struct RunArgs {
    /// Stages to run (empty = all)
    pub stages: Vec<String>,
    /// Check inputs without writing anything
    pub dry_run: bool,
}

/// Handle the `run` command
pub async fn handle_run(config: PipelineConfig, args: &RunArgs) -> Result<(), CliError> {
    let stages = parse_stages(&args.stages)?;
    let config = config.with_stages(stages).with_dry_run(args.dry_run);

    let report = execute(config).await?;
    output::print_clean_stats(&report.cleaned);
    if let Some(quality) = &report.quality {
        output::print_quality_report(quality);
    }
    output::print_load_stats(&report.loads);
    report.print_summary();

    eprintln!();
    eprintln!("Pipeline completed successfully!");
    Ok(())
}

/// Run the configured stages and return the report
pub(crate) async fn execute(config: PipelineConfig) -> Result<PipelineReport, CliError> {
    info!(
        storage = %config.storage.location,
        stages = ?config.effective_stages(),
        dry_run = config.dry_run,
        "Starting pipeline"
    );
    Ok(run_pipeline(config).await?)
}

fn parse_stages(raw: &[String]) -> Result<Vec<PipelineStage>, CliError> {
    raw.iter()
        .map(|s| s.parse::<PipelineStage>().map_err(CliError::InvalidArgument))
        .collect()
}
