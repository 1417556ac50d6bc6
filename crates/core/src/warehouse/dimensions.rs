//! Date dimension builder and dimension loaders
//!
//! Every loader maps silver rows to the column order of its [`TableSpec`] and
//! hands them to the sink; the table's conflict policy decides between
//! insert-once and upsert.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use tracing::info;

use super::schema::{DIM_CUSTOMER, DIM_DATE, DIM_GEOLOCATION, DIM_PRODUCT, DIM_SELLER, TableSpec};
use super::sink::{SqlValue, WarehouseSink};
use super::{LoadStats, WarehouseError};
use crate::models::{SilverCustomer, SilverGeolocation, SilverOrder, SilverProduct, SilverSeller};

/// A row of `dim_date`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRow {
    pub full_date: NaiveDate,
    pub year: i32,
    pub quarter: u32,
    pub month: u32,
    pub day: u32,
    /// English weekday name, e.g. `Monday`
    pub weekday: String,
}

impl DateRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            full_date: date,
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
            month: date.month(),
            day: date.day(),
            weekday: date.format("%A").to_string(),
        }
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Date(self.full_date),
            SqlValue::Int(i64::from(self.year)),
            SqlValue::Int(i64::from(self.quarter)),
            SqlValue::Int(i64::from(self.month)),
            SqlValue::Int(i64::from(self.day)),
            SqlValue::Text(self.weekday.clone()),
        ]
    }
}

/// Distinct dates of the five order lifecycle columns, ascending
pub fn build_date_dimension(orders: &[SilverOrder]) -> Vec<DateRow> {
    let dates: BTreeSet<NaiveDate> = orders
        .iter()
        .flat_map(|o| o.lifecycle_dates())
        .flatten()
        .collect();
    dates.into_iter().map(DateRow::new).collect()
}

async fn load(
    sink: &dyn WarehouseSink,
    spec: &TableSpec,
    rows: Vec<Vec<SqlValue>>,
) -> Result<LoadStats, WarehouseError> {
    let mut stats = LoadStats::new(spec);
    stats.rows_in = rows.len();
    stats.rows_written = sink.write(spec, &rows).await?;
    info!(table = spec.name, rows = stats.rows_in, written = stats.rows_written, "Loaded dimension");
    Ok(stats)
}

/// Insert-if-absent every order date
pub async fn load_dim_date(
    sink: &dyn WarehouseSink,
    orders: &[SilverOrder],
) -> Result<LoadStats, WarehouseError> {
    let rows = build_date_dimension(orders)
        .iter()
        .map(DateRow::values)
        .collect();
    load(sink, &DIM_DATE, rows).await
}

/// Upsert customers, updating city, state and state name
pub async fn load_dim_customer(
    sink: &dyn WarehouseSink,
    customers: &[SilverCustomer],
) -> Result<LoadStats, WarehouseError> {
    let rows = customers
        .iter()
        .map(|c| {
            vec![
                SqlValue::from(c.customer_id.as_str()),
                SqlValue::from(c.customer_unique_id.clone()),
                SqlValue::from(c.customer_zip_code_prefix.clone()),
                SqlValue::from(c.customer_city.clone()),
                SqlValue::from(c.customer_state.clone()),
                SqlValue::from(c.customer_state_name.clone()),
            ]
        })
        .collect();
    load(sink, &DIM_CUSTOMER, rows).await
}

/// Upsert sellers, updating city and state
pub async fn load_dim_seller(
    sink: &dyn WarehouseSink,
    sellers: &[SilverSeller],
) -> Result<LoadStats, WarehouseError> {
    let rows = sellers
        .iter()
        .map(|s| {
            vec![
                SqlValue::from(s.seller_id.as_str()),
                SqlValue::from(s.seller_zip_code_prefix.clone()),
                SqlValue::from(s.seller_city.clone()),
                SqlValue::from(s.seller_state.as_str()),
            ]
        })
        .collect();
    load(sink, &DIM_SELLER, rows).await
}

/// Values of a `dim_product` row
///
/// Volume is recomputed from the dimensions and truncated; the count columns
/// are truncated to integers.
pub fn product_values(p: &SilverProduct) -> Vec<SqlValue> {
    let truncate = |v: Option<f64>| v.map(|v| v.trunc() as i64);
    let volume = match (p.product_length_cm, p.product_height_cm, p.product_width_cm) {
        (Some(l), Some(h), Some(w)) => Some(l * h * w),
        _ => None,
    };

    vec![
        SqlValue::from(p.product_id.as_str()),
        SqlValue::from(p.product_category_name.as_str()),
        SqlValue::from(truncate(p.product_name_length)),
        SqlValue::from(truncate(p.product_description_length)),
        SqlValue::from(truncate(p.product_photos_qty)),
        SqlValue::from(p.product_weight_g),
        SqlValue::from(p.product_length_cm),
        SqlValue::from(p.product_height_cm),
        SqlValue::from(p.product_width_cm),
        SqlValue::Bool(p.size_anomaly),
        SqlValue::from(truncate(volume)),
    ]
}

/// Upsert products, updating category, weight and volume
pub async fn load_dim_product(
    sink: &dyn WarehouseSink,
    products: &[SilverProduct],
) -> Result<LoadStats, WarehouseError> {
    let rows = products.iter().map(product_values).collect();
    load(sink, &DIM_PRODUCT, rows).await
}

/// Insert-if-absent every (zip prefix, city, state)
pub async fn load_dim_geolocation(
    sink: &dyn WarehouseSink,
    geolocation: &[SilverGeolocation],
) -> Result<LoadStats, WarehouseError> {
    let rows = geolocation
        .iter()
        .map(|g| {
            vec![
                SqlValue::from(g.geolocation_zip_code_prefix.as_str()),
                SqlValue::from(g.geolocation_city.as_str()),
                SqlValue::from(g.geolocation_state.as_str()),
                SqlValue::from(g.latitude),
                SqlValue::from(g.longitude),
            ]
        })
        .collect();
    load(sink, &DIM_GEOLOCATION, rows).await
}
