//! The `init` command

use olist_dw_core::config::PipelineConfig;
use olist_dw_core::warehouse;
use tracing::info;

use crate::error::CliError;

/// Handle the `init` command: create the warehouse schema and tables
pub async fn handle_init(config: PipelineConfig) -> Result<(), CliError> {
    let sink = warehouse::connect(&config.warehouse).await?;

    if sink.is_initialized().await? {
        println!("Warehouse already initialized: {}", sink.describe());
        return Ok(());
    }

    sink.init().await?;
    info!(schema = sink.schema(), "Provisioned warehouse");
    println!("Initialized warehouse: {}", sink.describe());
    Ok(())
}
