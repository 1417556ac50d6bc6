//! The `load` command

use olist_dw_core::config::PipelineConfig;
use olist_dw_core::pipeline::PipelineStage;

use super::run::execute;
use crate::error::CliError;
use crate::output;

/// Handle the `load` command: dimensions, then facts
pub async fn handle_load(config: PipelineConfig) -> Result<(), CliError> {
    let config =
        config.with_stages(vec![PipelineStage::LoadDimensions, PipelineStage::LoadFacts]);
    let report = execute(config).await?;

    output::print_load_stats(&report.loads);
    report.print_summary();
    Ok(())
}
