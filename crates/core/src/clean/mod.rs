//! Entity cleaners (raw to silver)
//!
//! Each entity has a pure transform in its own module. [`Cleaner`] wires a
//! transform to the blob store: it reads the raw CSV extract, runs the
//! transform and writes the silver Parquet artifact.

pub mod customers;
pub mod geolocation;
pub mod normalize;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod sellers;

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use arrow::datatypes::SchemaRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    CUSTOMERS_UNIQUE_PATH, RawCategoryTranslation, RawCustomer, RawGeolocation, RawOrder,
    RawOrderItem, RawPayment, RawProduct, RawReview, RawSeller, SilverCustomer,
};
use crate::storage::{BlobStore, StorageError, join_path};
use crate::tabular::{self, SilverDataset, TabularError};

pub use customers::{CleanedCustomers, clean_customers};
pub use geolocation::clean_geolocation;
pub use order_items::clean_order_items;
pub use orders::{clean_orders, time_anomaly};
pub use payments::clean_payments;
pub use products::{category_translations, clean_products};
pub use reviews::clean_reviews;
pub use sellers::clean_sellers;

/// Prefix of the raw layer
pub const RAW_PREFIX: &str = "raw";

/// Optional category translation extract
pub const TRANSLATION_FILE: &str = "product_category_name_translation.csv";

/// Output of a pure cleaning transform
#[derive(Debug, Clone, Default)]
pub struct Cleaned<T> {
    /// Cleaned rows, in output order
    pub rows: Vec<T>,
    /// Rows dropped because their natural key was missing
    pub rejected: usize,
}

/// Errors that abort a cleaner
#[derive(Error, Debug)]
pub enum CleanError {
    /// The raw extract does not exist
    #[error("Raw source missing: {path}")]
    SourceMissing { path: String },

    /// The raw extract cannot be decoded at all
    #[error("Raw source {path} is corrupt: {reason}")]
    CorruptSource { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] TabularError),

    /// Unknown entity name
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

impl CleanError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CleanError::SourceMissing { path } => format!(
                "Raw source missing: {path}\n\nHint: Upload the Olist CSV extracts under raw/ before cleaning."
            ),
            CleanError::CorruptSource { path, reason } => format!(
                "Raw source {path} is corrupt: {reason}\n\nHint: Re-download the extract; the header row must be present."
            ),
            CleanError::UnknownEntity(name) => format!(
                "Unknown entity: {name}\n\nHint: Valid entities are: {}",
                Entity::all()
                    .iter()
                    .map(|e| e.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CleanError::Storage(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

/// Source entities, in cleaning order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Orders,
    Customers,
    OrderItems,
    Products,
    Sellers,
    Payments,
    Reviews,
    Geolocation,
}

impl Entity {
    /// All entities in cleaning order
    pub fn all() -> &'static [Entity] {
        &[
            Entity::Orders,
            Entity::Customers,
            Entity::OrderItems,
            Entity::Products,
            Entity::Sellers,
            Entity::Payments,
            Entity::Reviews,
            Entity::Geolocation,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Entity::Orders => "orders",
            Entity::Customers => "customers",
            Entity::OrderItems => "order_items",
            Entity::Products => "products",
            Entity::Sellers => "sellers",
            Entity::Payments => "payments",
            Entity::Reviews => "reviews",
            Entity::Geolocation => "geolocation",
        }
    }

    /// File name of the raw extract
    pub fn raw_file(&self) -> &'static str {
        match self {
            Entity::Orders => "olist_orders_dataset.csv",
            Entity::Customers => "olist_customers_dataset.csv",
            Entity::OrderItems => "olist_order_items_dataset.csv",
            Entity::Products => "olist_products_dataset.csv",
            Entity::Sellers => "olist_sellers_dataset.csv",
            Entity::Payments => "olist_order_payments_dataset.csv",
            Entity::Reviews => "olist_order_reviews_dataset.csv",
            Entity::Geolocation => "olist_geolocation_dataset.csv",
        }
    }

    /// Path of the raw extract inside the store
    pub fn raw_path(&self) -> String {
        join_path(RAW_PREFIX, self.raw_file())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Entity {
    type Err = CleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Entity::all()
            .iter()
            .copied()
            .find(|e| e.name() == normalized)
            .ok_or_else(|| CleanError::UnknownEntity(s.to_string()))
    }
}

/// A written silver artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStats {
    pub path: String,
    pub rows: usize,
    /// Hex SHA-256 of the file content
    pub sha256: String,
}

/// Statistics from one cleaner run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanStats {
    pub entity: Entity,
    /// Rows decoded from the raw extract plus undecodable ones
    pub rows_read: usize,
    /// Undecodable rows and rows without a natural key
    pub rows_rejected: usize,
    /// Written artifacts; customers produce two
    pub outputs: Vec<ArtifactStats>,
    #[serde(skip)]
    pub duration: Duration,
}

impl CleanStats {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            rows_read: 0,
            rows_rejected: 0,
            outputs: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Rows in the primary artifact
    pub fn rows_written(&self) -> usize {
        self.outputs.first().map(|o| o.rows).unwrap_or(0)
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let millis = self.duration.as_millis();
        if millis < 1000 {
            format!("{}ms", millis)
        } else {
            format!("{:.1}s", self.duration.as_secs_f64())
        }
    }
}

/// Runs entity cleaners against a blob store
pub struct Cleaner<'a> {
    store: &'a dyn BlobStore,
}

impl<'a> Cleaner<'a> {
    pub fn new(store: &'a dyn BlobStore) -> Self {
        Self { store }
    }

    /// Clean every entity in order, stopping at the first fatal error
    pub async fn run_all(&self) -> Result<Vec<CleanStats>, CleanError> {
        self.run_selected(Entity::all()).await
    }

    /// Clean the given entities, in the fixed entity order
    pub async fn run_selected(&self, entities: &[Entity]) -> Result<Vec<CleanStats>, CleanError> {
        let mut all = Vec::new();
        for entity in Entity::all().iter().filter(|e| entities.contains(e)) {
            all.push(self.run(*entity).await?);
        }
        Ok(all)
    }

    /// Clean one entity
    pub async fn run(&self, entity: Entity) -> Result<CleanStats, CleanError> {
        let start = Instant::now();
        let mut stats = CleanStats::new(entity);

        match entity {
            Entity::Orders => {
                let raw = self.read_raw::<RawOrder>(entity, &mut stats).await?;
                let cleaned = clean_orders(raw);
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
            Entity::Customers => {
                let raw = self.read_raw::<RawCustomer>(entity, &mut stats).await?;
                let cleaned = clean_customers(raw);
                stats.rows_rejected += cleaned.rejected;
                stats
                    .outputs
                    .push(write_dataset(self.store, &cleaned.customers).await?);
                stats.outputs.push(
                    write_artifact(
                        self.store,
                        CUSTOMERS_UNIQUE_PATH,
                        SilverCustomer::schema(),
                        &cleaned.unique_customers,
                    )
                    .await?,
                );
            }
            Entity::OrderItems => {
                let raw = self.read_raw::<RawOrderItem>(entity, &mut stats).await?;
                let cleaned = clean_order_items(raw);
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
            Entity::Products => {
                let raw = self.read_raw::<RawProduct>(entity, &mut stats).await?;
                let translations = self.read_translations().await;
                let cleaned = clean_products(raw, translations.as_ref());
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
            Entity::Sellers => {
                let raw = self.read_raw::<RawSeller>(entity, &mut stats).await?;
                let cleaned = clean_sellers(raw);
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
            Entity::Payments => {
                let raw = self.read_raw::<RawPayment>(entity, &mut stats).await?;
                let cleaned = clean_payments(raw);
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
            Entity::Reviews => {
                let raw = self.read_raw::<RawReview>(entity, &mut stats).await?;
                let cleaned = clean_reviews(raw);
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
            Entity::Geolocation => {
                let raw = self.read_raw::<RawGeolocation>(entity, &mut stats).await?;
                let cleaned = clean_geolocation(raw);
                stats.rows_rejected += cleaned.rejected;
                stats.outputs.push(write_dataset(self.store, &cleaned.rows).await?);
            }
        }

        stats.duration = start.elapsed();
        if stats.rows_rejected > 0 {
            warn!(entity = %entity, rejected = stats.rows_rejected, "Rejected raw rows");
        }
        info!(
            entity = %entity,
            rows_read = stats.rows_read,
            rows_written = stats.rows_written(),
            duration = %stats.duration_string(),
            "Cleaned entity"
        );
        Ok(stats)
    }

    async fn read_raw<T: DeserializeOwned>(
        &self,
        entity: Entity,
        stats: &mut CleanStats,
    ) -> Result<Vec<T>, CleanError> {
        let path = entity.raw_path();
        let bytes = self.store.read(&path).await.map_err(|e| match e {
            StorageError::NotFound(_) => CleanError::SourceMissing { path: path.clone() },
            other => CleanError::Storage(other),
        })?;
        debug!(path = %path, bytes = bytes.len(), "Read raw extract");

        let decoded = tabular::read_csv::<T>(&bytes).map_err(|e| CleanError::CorruptSource {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        stats.rows_read = decoded.rows.len() + decoded.rejected;
        stats.rows_rejected = decoded.rejected;
        Ok(decoded.rows)
    }

    /// Category translations, or `None` when the extract is unavailable
    async fn read_translations(&self) -> Option<std::collections::HashMap<String, String>> {
        let path = join_path(RAW_PREFIX, TRANSLATION_FILE);
        let bytes = match self.store.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path, error = %e, "Category translations unavailable, keeping source names");
                return None;
            }
        };
        match tabular::read_csv::<RawCategoryTranslation>(&bytes) {
            Ok(decoded) => Some(category_translations(decoded.rows)),
            Err(e) => {
                warn!(path = %path, error = %e, "Category translations unreadable, keeping source names");
                None
            }
        }
    }
}

/// Write a silver dataset to its fixed path
pub async fn write_dataset<T: SilverDataset>(
    store: &dyn BlobStore,
    rows: &[T],
) -> Result<ArtifactStats, CleanError> {
    write_artifact(store, T::PATH, T::schema(), rows).await
}

/// Encode rows as Parquet, write them and return the artifact digest
pub async fn write_artifact<T: Serialize>(
    store: &dyn BlobStore,
    path: &str,
    schema: SchemaRef,
    rows: &[T],
) -> Result<ArtifactStats, CleanError> {
    let bytes = tabular::encode_parquet(schema, rows)?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    store.write(path, &bytes).await?;
    debug!(path = %path, rows = rows.len(), sha256 = %sha256, "Wrote silver artifact");
    Ok(ArtifactStats {
        path: path.to_string(),
        rows: rows.len(),
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_order_and_names() {
        let names: Vec<_> = Entity::all().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "orders",
                "customers",
                "order_items",
                "products",
                "sellers",
                "payments",
                "reviews",
                "geolocation"
            ]
        );
        assert_eq!(
            Entity::Payments.raw_path(),
            "raw/olist_order_payments_dataset.csv"
        );
    }

    #[test]
    fn test_entity_from_str() {
        assert_eq!("order-items".parse::<Entity>().unwrap(), Entity::OrderItems);
        assert_eq!("Reviews".parse::<Entity>().unwrap(), Entity::Reviews);
        assert!(matches!(
            "invoices".parse::<Entity>(),
            Err(CleanError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_user_message_hints() {
        let err = CleanError::SourceMissing {
            path: "raw/olist_orders_dataset.csv".to_string(),
        };
        assert!(err.user_message().contains("Hint:"));

        let err = CleanError::UnknownEntity("x".to_string());
        assert!(err.user_message().contains("order_items"));
    }
}
