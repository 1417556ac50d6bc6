//! Validation engine
//!
//! Runs a fixed battery of referential, coverage and consistency checks over
//! the silver layer. Violations are findings recorded in the report, not
//! errors; only an unreadable silver dataset fails the stage.

pub mod checks;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    SilverCustomer, SilverGeolocation, SilverOrder, SilverOrderItem, SilverPayment, SilverProduct,
    SilverReview, SilverSeller,
};
use crate::storage::{BlobStore, StorageError};
use crate::tabular::{self, SilverDataset, TabularError};

pub use checks::{AmountMismatch, Violations, amount_mismatches};

/// Where the report is persisted
pub const REPORT_PATH: &str = "silver/reports/data_quality_report.parquet";

/// Maximum number of sample keys per check
pub const SAMPLE_LIMIT: usize = 5;

/// Tolerance of the amount consistency check, in currency units
pub const AMOUNT_TOLERANCE: f64 = 0.01;

/// Errors raised while loading inputs or persisting the report
#[derive(Error, Debug)]
pub enum QualityError {
    #[error("Silver dataset missing: {path}")]
    MissingDataset { path: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] TabularError),
}

impl QualityError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            QualityError::MissingDataset { path } if path == REPORT_PATH => format!(
                "No quality report at {path}\n\nHint: Run 'olist-dw validate' first."
            ),
            QualityError::MissingDataset { path } => format!(
                "Silver dataset missing: {path}\n\nHint: Run the clean stage first (olist-dw clean)."
            ),
            QualityError::Storage(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Passed,
    Failed,
}

impl CheckStatus {
    fn from_count(violations: u64) -> Self {
        if violations == 0 {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "PASSED"),
            CheckStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// The registered checks, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckId {
    OrdersCustomerFk,
    OrderItemsOrderFk,
    OrderItemsSellerFk,
    OrderItemsProductFk,
    PaymentsOrderFk,
    ReviewsOrderFk,
    CustomersZipCoverage,
    SellersZipCoverage,
    AmountConsistency,
}

impl CheckId {
    pub fn all() -> &'static [CheckId] {
        &[
            CheckId::OrdersCustomerFk,
            CheckId::OrderItemsOrderFk,
            CheckId::OrderItemsSellerFk,
            CheckId::OrderItemsProductFk,
            CheckId::PaymentsOrderFk,
            CheckId::ReviewsOrderFk,
            CheckId::CustomersZipCoverage,
            CheckId::SellersZipCoverage,
            CheckId::AmountConsistency,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckId::OrdersCustomerFk => "orders_customer_fk",
            CheckId::OrderItemsOrderFk => "order_items_order_fk",
            CheckId::OrderItemsSellerFk => "order_items_seller_fk",
            CheckId::OrderItemsProductFk => "order_items_product_fk",
            CheckId::PaymentsOrderFk => "payments_order_fk",
            CheckId::ReviewsOrderFk => "reviews_order_fk",
            CheckId::CustomersZipCoverage => "customers_zip_coverage",
            CheckId::SellersZipCoverage => "sellers_zip_coverage",
            CheckId::AmountConsistency => "amount_consistency",
        }
    }

    /// Table the check reports against
    pub fn table_name(&self) -> &'static str {
        match self {
            CheckId::OrdersCustomerFk | CheckId::AmountConsistency => "orders",
            CheckId::OrderItemsOrderFk
            | CheckId::OrderItemsSellerFk
            | CheckId::OrderItemsProductFk => "order_items",
            CheckId::PaymentsOrderFk => "order_payments",
            CheckId::ReviewsOrderFk => "order_reviews",
            CheckId::CustomersZipCoverage => "customers",
            CheckId::SellersZipCoverage => "sellers",
        }
    }
}

/// Result of one check, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    pub table_name: String,
    pub status: CheckStatus,
    pub violation_count: u64,
    /// Percentage, coverage checks only
    pub coverage_rate: Option<f64>,
    pub sample_violations: Vec<String>,
}

impl CheckResult {
    fn new(id: CheckId, violations: Violations, coverage_rate: Option<f64>) -> Self {
        Self {
            check_name: id.name().to_string(),
            table_name: id.table_name().to_string(),
            status: CheckStatus::from_count(violations.count),
            violation_count: violations.count,
            coverage_rate,
            sample_violations: violations.samples,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}

/// Arrow schema of the persisted report
pub fn report_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("check_name", DataType::Utf8, false),
        Field::new("table_name", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("violation_count", DataType::Int64, false),
        Field::new("coverage_rate", DataType::Float64, true),
        Field::new_list(
            "sample_violations",
            Field::new("item", DataType::Utf8, true),
            false,
        ),
    ]))
}

/// All checks of one validation run, in [`CheckId::all`] order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub results: Vec<CheckResult>,
}

impl QualityReport {
    /// Look up a check by id
    pub fn get(&self, id: CheckId) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check_name == id.name())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// True when every check passed
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(CheckResult::passed)
    }

    /// Write the report to [`REPORT_PATH`]
    pub async fn persist(&self, store: &dyn BlobStore) -> Result<(), QualityError> {
        let bytes = tabular::encode_parquet(report_schema(), &self.results)?;
        store.write(REPORT_PATH, &bytes).await?;
        debug!(path = REPORT_PATH, checks = self.results.len(), "Persisted quality report");
        Ok(())
    }

    /// Read the last persisted report
    pub async fn load(store: &dyn BlobStore) -> Result<Self, QualityError> {
        let results = read_path(store, REPORT_PATH).await?;
        Ok(Self { results })
    }
}

/// The silver datasets the checks run over
#[derive(Debug, Clone, Default)]
pub struct SilverTables {
    pub orders: Vec<SilverOrder>,
    pub customers: Vec<SilverCustomer>,
    pub order_items: Vec<SilverOrderItem>,
    pub products: Vec<SilverProduct>,
    pub sellers: Vec<SilverSeller>,
    pub payments: Vec<SilverPayment>,
    pub reviews: Vec<SilverReview>,
    pub geolocation: Vec<SilverGeolocation>,
}

impl SilverTables {
    /// Read every silver dataset from the store
    pub async fn load(store: &dyn BlobStore) -> Result<Self, QualityError> {
        Ok(Self {
            orders: read_dataset(store).await?,
            customers: read_dataset(store).await?,
            order_items: read_dataset(store).await?,
            products: read_dataset(store).await?,
            sellers: read_dataset(store).await?,
            payments: read_dataset(store).await?,
            reviews: read_dataset(store).await?,
            geolocation: read_dataset(store).await?,
        })
    }
}

/// Read a silver dataset from its fixed path
pub async fn read_dataset<T: SilverDataset>(store: &dyn BlobStore) -> Result<Vec<T>, QualityError> {
    read_path(store, T::PATH).await
}

async fn read_path<T: DeserializeOwned>(
    store: &dyn BlobStore,
    path: &str,
) -> Result<Vec<T>, QualityError> {
    let bytes = store.read(path).await.map_err(|e| match e {
        StorageError::NotFound(_) => QualityError::MissingDataset {
            path: path.to_string(),
        },
        other => QualityError::Storage(other),
    })?;
    Ok(tabular::decode_parquet(bytes)?)
}

/// Runs the registered checks
#[derive(Debug, Clone)]
pub struct QualityEngine {
    sample_limit: usize,
    tolerance: f64,
}

impl Default for QualityEngine {
    fn default() -> Self {
        Self {
            sample_limit: SAMPLE_LIMIT,
            tolerance: AMOUNT_TOLERANCE,
        }
    }
}

impl QualityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the amount consistency tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the number of sample keys kept per check
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Run every check, one result per [`CheckId`] in order
    pub fn run(&self, tables: &SilverTables) -> QualityReport {
        let results: Vec<CheckResult> = CheckId::all()
            .iter()
            .map(|id| self.run_check(*id, tables))
            .collect();

        for result in results.iter().filter(|r| !r.passed()) {
            warn!(
                check = %result.check_name,
                violations = result.violation_count,
                "Quality check failed"
            );
        }
        info!(
            checks = results.len(),
            failed = results.iter().filter(|r| !r.passed()).count(),
            "Quality checks complete"
        );
        QualityReport { results }
    }

    /// Run a single check
    pub fn run_check(&self, id: CheckId, t: &SilverTables) -> CheckResult {
        let limit = self.sample_limit;
        match id {
            CheckId::OrdersCustomerFk => {
                let keys: HashSet<&str> = t.customers.iter().map(|c| c.customer_id.as_str()).collect();
                let v = checks::missing_references(
                    &t.orders,
                    |o| o.customer_id.as_deref(),
                    |o| Some(o.order_id.as_str()),
                    &keys,
                    limit,
                );
                CheckResult::new(id, v, None)
            }
            CheckId::OrderItemsOrderFk => {
                let keys = order_keys(&t.orders);
                let v = checks::missing_references(
                    &t.order_items,
                    |i| Some(i.order_id.as_str()),
                    |i| Some(i.order_id.as_str()),
                    &keys,
                    limit,
                );
                CheckResult::new(id, v, None)
            }
            CheckId::OrderItemsSellerFk => {
                let keys: HashSet<&str> = t.sellers.iter().map(|s| s.seller_id.as_str()).collect();
                let v = checks::missing_references(
                    &t.order_items,
                    |i| i.seller_id.as_deref(),
                    |i| i.seller_id.as_deref(),
                    &keys,
                    limit,
                );
                CheckResult::new(id, v, None)
            }
            CheckId::OrderItemsProductFk => {
                let keys: HashSet<&str> = t.products.iter().map(|p| p.product_id.as_str()).collect();
                let v = checks::missing_references(
                    &t.order_items,
                    |i| i.product_id.as_deref(),
                    |i| i.product_id.as_deref(),
                    &keys,
                    limit,
                );
                CheckResult::new(id, v, None)
            }
            CheckId::PaymentsOrderFk => {
                let keys = order_keys(&t.orders);
                let v = checks::missing_references(
                    &t.payments,
                    |p| Some(p.order_id.as_str()),
                    |p| Some(p.order_id.as_str()),
                    &keys,
                    limit,
                );
                CheckResult::new(id, v, None)
            }
            CheckId::ReviewsOrderFk => {
                let keys = order_keys(&t.orders);
                let v = checks::missing_references(
                    &t.reviews,
                    |r| Some(r.order_id.as_str()),
                    |r| Some(r.order_id.as_str()),
                    &keys,
                    limit,
                );
                CheckResult::new(id, v, None)
            }
            CheckId::CustomersZipCoverage => {
                let zips = geo_zips(&t.geolocation);
                let (v, rate) = checks::zip_coverage(
                    &t.customers,
                    |c| c.customer_zip_code_prefix.as_deref(),
                    |c| Some(c.customer_id.as_str()),
                    &zips,
                    limit,
                );
                CheckResult::new(id, v, Some(rate))
            }
            CheckId::SellersZipCoverage => {
                let zips = geo_zips(&t.geolocation);
                let (v, rate) = checks::zip_coverage(
                    &t.sellers,
                    |s| s.seller_zip_code_prefix.as_deref(),
                    |s| Some(s.seller_id.as_str()),
                    &zips,
                    limit,
                );
                CheckResult::new(id, v, Some(rate))
            }
            CheckId::AmountConsistency => {
                let mismatches = amount_mismatches(&t.order_items, &t.payments, self.tolerance);
                let v = Violations {
                    count: mismatches.len() as u64,
                    samples: mismatches
                        .into_iter()
                        .take(limit)
                        .map(|m| m.order_id)
                        .collect(),
                };
                CheckResult::new(id, v, None)
            }
        }
    }
}

fn order_keys(orders: &[SilverOrder]) -> HashSet<&str> {
    orders.iter().map(|o| o.order_id.as_str()).collect()
}

fn geo_zips(geolocation: &[SilverGeolocation]) -> HashSet<&str> {
    geolocation
        .iter()
        .map(|g| g.geolocation_zip_code_prefix.as_str())
        .collect()
}
