//! The `report` command

use olist_dw_core::config::PipelineConfig;
use olist_dw_core::quality::QualityReport;
use olist_dw_core::storage;

use crate::error::CliError;
use crate::output;

/// Arguments for the `report` command
pub struct ReportArgs {
    /// Print JSON instead of a table
    pub json: bool,
}

/// Handle the `report` command: print the last persisted quality report
pub async fn handle_report(config: PipelineConfig, args: &ReportArgs) -> Result<(), CliError> {
    let store = storage::open(&config.storage).await?;
    let report = QualityReport::load(store.as_ref()).await?;

    if args.json {
        output::print_quality_json(&report)
            .map_err(|e| CliError::OutputError(e.to_string()))?;
    } else {
        output::print_quality_report(&report);
    }
    Ok(())
}
