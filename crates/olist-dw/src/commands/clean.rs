//! The `clean` command

use olist_dw_core::clean::{Cleaner, Entity};
use olist_dw_core::config::PipelineConfig;
use olist_dw_core::storage;
use tracing::info;

use crate::error::CliError;
use crate::output;

/// Arguments for the `clean` command
pub struct CleanArgs {
    /// Entities to clean (empty = all)
    pub entities: Vec<String>,
}

/// Handle the `clean` command
pub async fn handle_clean(config: PipelineConfig, args: &CleanArgs) -> Result<(), CliError> {
    let entities = args
        .entities
        .iter()
        .map(|e| e.parse::<Entity>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let store = storage::open(&config.storage).await?;
    info!(storage = %config.storage.location, "Cleaning raw extracts");

    let cleaner = Cleaner::new(store.as_ref());
    let stats = if entities.is_empty() {
        cleaner.run_all().await?
    } else {
        cleaner.run_selected(&entities).await?
    };

    output::print_clean_stats(&stats);
    eprintln!();
    eprintln!("Cleaned {} entities", stats.len());
    Ok(())
}
