//! Fact loaders
//!
//! Natural keys are resolved against the loaded dimensions; a lookup miss
//! leaves the foreign key null and is counted. Facts are insert-once.
//! Child facts require their order in `fact_orders`, so `load_fact_orders`
//! must run first.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{info, warn};

use super::schema::{
    DIM_CUSTOMER, DIM_DATE, DIM_PRODUCT, DIM_SELLER, FACT_ORDER_ITEMS, FACT_ORDERS, FACT_PAYMENTS,
    FACT_REVIEWS, TableSpec,
};
use super::sink::{SqlValue, WarehouseSink};
use super::{LoadStats, WarehouseError};
use crate::models::{SilverOrder, SilverOrderItem, SilverPayment, SilverReview};

/// Surrogate-key lookup that counts misses
struct Resolver {
    keys: HashMap<String, i64>,
}

impl Resolver {
    async fn load(sink: &dyn WarehouseSink, spec: &TableSpec) -> Result<Self, WarehouseError> {
        Ok(Self {
            keys: sink.key_map(spec).await?,
        })
    }

    /// Absent keys resolve to null without counting
    fn resolve(&self, key: Option<&str>, unresolved: &mut usize) -> SqlValue {
        match key {
            None => SqlValue::Null,
            Some(k) => match self.keys.get(k) {
                Some(sk) => SqlValue::Int(*sk),
                None => {
                    *unresolved += 1;
                    SqlValue::Null
                }
            },
        }
    }

    fn resolve_date(&self, date: Option<NaiveDate>, unresolved: &mut usize) -> SqlValue {
        let key = date.map(|d| d.format("%Y-%m-%d").to_string());
        self.resolve(key.as_deref(), unresolved)
    }
}

async fn finish(
    sink: &dyn WarehouseSink,
    spec: &TableSpec,
    mut stats: LoadStats,
    rows: Vec<Vec<SqlValue>>,
) -> Result<LoadStats, WarehouseError> {
    stats.rows_written = sink.write(spec, &rows).await?;
    if stats.rows_skipped > 0 {
        warn!(table = spec.name, skipped = stats.rows_skipped, "Skipped fact rows");
    }
    if stats.unresolved_keys > 0 {
        warn!(table = spec.name, unresolved = stats.unresolved_keys, "Unresolved dimension keys");
    }
    info!(table = spec.name, rows = stats.rows_in, written = stats.rows_written, "Loaded facts");
    Ok(stats)
}

async fn loaded_orders(sink: &dyn WarehouseSink) -> Result<HashSet<String>, WarehouseError> {
    sink.existing_keys(&FACT_ORDERS, "order_id").await
}

/// Insert orders with customer and date surrogate keys
pub async fn load_fact_orders(
    sink: &dyn WarehouseSink,
    orders: &[SilverOrder],
) -> Result<LoadStats, WarehouseError> {
    let customers = Resolver::load(sink, &DIM_CUSTOMER).await?;
    let dates = Resolver::load(sink, &DIM_DATE).await?;

    let mut stats = LoadStats::new(&FACT_ORDERS);
    stats.rows_in = orders.len();

    let rows = orders
        .iter()
        .map(|o| {
            let unresolved = &mut stats.unresolved_keys;
            let mut row = vec![
                SqlValue::from(o.order_id.as_str()),
                customers.resolve(o.customer_id.as_deref(), unresolved),
                SqlValue::from(o.order_status.name()),
            ];
            for date in o.lifecycle_dates() {
                row.push(dates.resolve_date(date, unresolved));
            }
            row
        })
        .collect();

    finish(sink, &FACT_ORDERS, stats, rows).await
}

/// Insert order items keyed by (order id, item sequence)
pub async fn load_fact_order_items(
    sink: &dyn WarehouseSink,
    items: &[SilverOrderItem],
) -> Result<LoadStats, WarehouseError> {
    let orders = loaded_orders(sink).await?;
    let products = Resolver::load(sink, &DIM_PRODUCT).await?;
    let sellers = Resolver::load(sink, &DIM_SELLER).await?;
    let dates = Resolver::load(sink, &DIM_DATE).await?;

    let mut stats = LoadStats::new(&FACT_ORDER_ITEMS);
    stats.rows_in = items.len();

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Some(seq) = item.order_item_id else {
            stats.rows_skipped += 1;
            continue;
        };
        if !orders.contains(&item.order_id) {
            stats.rows_skipped += 1;
            continue;
        }
        let unresolved = &mut stats.unresolved_keys;
        rows.push(vec![
            SqlValue::from(item.order_id.as_str()),
            SqlValue::Int(seq),
            products.resolve(item.product_id.as_deref(), unresolved),
            sellers.resolve(item.seller_id.as_deref(), unresolved),
            dates.resolve_date(item.shipping_limit_date, unresolved),
            SqlValue::from(item.price),
            SqlValue::from(item.freight_value),
        ]);
    }

    finish(sink, &FACT_ORDER_ITEMS, stats, rows).await
}

/// Insert payments keyed by (order id, payment sequence)
pub async fn load_fact_payments(
    sink: &dyn WarehouseSink,
    payments: &[SilverPayment],
) -> Result<LoadStats, WarehouseError> {
    let orders = loaded_orders(sink).await?;

    let mut stats = LoadStats::new(&FACT_PAYMENTS);
    stats.rows_in = payments.len();

    let mut rows = Vec::with_capacity(payments.len());
    for payment in payments {
        let Some(seq) = payment.payment_sequential else {
            stats.rows_skipped += 1;
            continue;
        };
        if !orders.contains(&payment.order_id) {
            stats.rows_skipped += 1;
            continue;
        }
        rows.push(vec![
            SqlValue::from(payment.order_id.as_str()),
            SqlValue::Int(seq),
            SqlValue::from(payment.payment_type.as_str()),
            SqlValue::from(payment.payment_installments),
            SqlValue::from(payment.payment_value),
        ]);
    }

    finish(sink, &FACT_PAYMENTS, stats, rows).await
}

/// Insert reviews keyed by review id, resolving the creation date
pub async fn load_fact_reviews(
    sink: &dyn WarehouseSink,
    reviews: &[SilverReview],
) -> Result<LoadStats, WarehouseError> {
    let orders = loaded_orders(sink).await?;
    let dates = Resolver::load(sink, &DIM_DATE).await?;

    let mut stats = LoadStats::new(&FACT_REVIEWS);
    stats.rows_in = reviews.len();

    let mut rows = Vec::with_capacity(reviews.len());
    for review in reviews {
        if !orders.contains(&review.order_id) {
            stats.rows_skipped += 1;
            continue;
        }
        let created = review.review_creation_date.map(|ts| ts.date_naive());
        rows.push(vec![
            SqlValue::from(review.review_id.as_str()),
            SqlValue::from(review.order_id.as_str()),
            SqlValue::from(review.review_score),
            SqlValue::from(review.review_comment_title.clone()),
            SqlValue::from(review.review_comment_message.clone()),
            dates.resolve_date(created, &mut stats.unresolved_keys),
        ]);
    }

    finish(sink, &FACT_REVIEWS, stats, rows).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_counts_misses_only_for_present_keys() {
        let resolver = Resolver {
            keys: [("c1".to_string(), 7)].into_iter().collect(),
        };
        let mut unresolved = 0;
        assert_eq!(resolver.resolve(Some("c1"), &mut unresolved), SqlValue::Int(7));
        assert_eq!(resolver.resolve(None, &mut unresolved), SqlValue::Null);
        assert_eq!(unresolved, 0);
        assert_eq!(resolver.resolve(Some("c9"), &mut unresolved), SqlValue::Null);
        assert_eq!(unresolved, 1);
    }

    #[test]
    fn test_resolve_date_uses_iso_key() {
        let resolver = Resolver {
            keys: [("2018-01-02".to_string(), 3)].into_iter().collect(),
        };
        let mut unresolved = 0;
        let date = NaiveDate::from_ymd_opt(2018, 1, 2);
        assert_eq!(resolver.resolve_date(date, &mut unresolved), SqlValue::Int(3));
    }
}
