//! The `validate` command

use olist_dw_core::config::PipelineConfig;
use olist_dw_core::pipeline::PipelineStage;
use olist_dw_core::quality::REPORT_PATH;

use super::run::execute;
use crate::error::CliError;
use crate::output;

/// Arguments for the `validate` command
pub struct ValidateArgs {
    /// Exit with code 2 when a check failed
    pub strict: bool,
}

/// Handle the `validate` command
pub async fn handle_validate(config: PipelineConfig, args: &ValidateArgs) -> Result<(), CliError> {
    let report = execute(config.with_stages(vec![PipelineStage::Validate])).await?;

    let Some(quality) = &report.quality else {
        return Ok(());
    };
    output::print_quality_report(quality);
    eprintln!();
    eprintln!("Report written to {REPORT_PATH}");

    let failed = quality.failed().count();
    if args.strict && failed > 0 {
        return Err(CliError::ChecksFailed(failed));
    }
    Ok(())
}
