//! Cleaned (silver layer) records and their Parquet schemas
//!
//! Dates are stored as `YYYY-MM-DD` strings and timestamps as RFC 3339
//! strings, which is how chrono serializes them.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::lookup::OrderStatus;
use crate::tabular::SilverDataset;

/// Path of the customers dataset deduplicated on `customer_unique_id`
pub const CUSTOMERS_UNIQUE_PATH: &str = "silver/customers_unique.parquet";

fn utf8(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Utf8, nullable)
}

fn float(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

fn int(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Int64, nullable)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverOrder {
    pub order_id: String,
    pub customer_id: Option<String>,
    pub order_status: OrderStatus,
    pub order_purchase_timestamp: Option<NaiveDate>,
    pub order_approved_at: Option<NaiveDate>,
    pub order_delivered_carrier_date: Option<NaiveDate>,
    pub order_delivered_customer_date: Option<NaiveDate>,
    pub order_estimated_delivery_date: Option<NaiveDate>,
    /// Calendar day of the purchase
    pub order_purchase_date: Option<NaiveDate>,
    /// 1 when the status is recognised
    pub status_flag: u8,
    /// 1 when the lifecycle dates are out of order
    pub time_anomaly: u8,
    /// 1 when the customer delivery date is known
    pub delivered_flag: u8,
}

impl SilverOrder {
    /// The five lifecycle dates in chronological order
    pub fn lifecycle_dates(&self) -> [Option<NaiveDate>; 5] {
        [
            self.order_purchase_timestamp,
            self.order_approved_at,
            self.order_delivered_carrier_date,
            self.order_delivered_customer_date,
            self.order_estimated_delivery_date,
        ]
    }
}

impl SilverDataset for SilverOrder {
    const PATH: &'static str = "silver/orders.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("order_id", false),
            utf8("customer_id", true),
            utf8("order_status", false),
            utf8("order_purchase_timestamp", true),
            utf8("order_approved_at", true),
            utf8("order_delivered_carrier_date", true),
            utf8("order_delivered_customer_date", true),
            utf8("order_estimated_delivery_date", true),
            utf8("order_purchase_date", true),
            int("status_flag", false),
            int("time_anomaly", false),
            int("delivered_flag", false),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverCustomer {
    pub customer_id: String,
    pub customer_unique_id: Option<String>,
    pub customer_zip_code_prefix: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub customer_state_name: Option<String>,
}

impl SilverDataset for SilverCustomer {
    const PATH: &'static str = "silver/customers.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("customer_id", false),
            utf8("customer_unique_id", true),
            utf8("customer_zip_code_prefix", true),
            utf8("customer_city", true),
            utf8("customer_state", true),
            utf8("customer_state_name", true),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverOrderItem {
    pub order_id: String,
    pub order_item_id: Option<i64>,
    pub product_id: Option<String>,
    pub seller_id: Option<String>,
    pub shipping_limit_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub freight_value: Option<f64>,
}

impl SilverDataset for SilverOrderItem {
    const PATH: &'static str = "silver/order_items.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("order_id", false),
            int("order_item_id", true),
            utf8("product_id", true),
            utf8("seller_id", true),
            utf8("shipping_limit_date", true),
            float("price"),
            float("freight_value"),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverProduct {
    pub product_id: String,
    pub product_category_name: String,
    pub product_name_length: Option<f64>,
    pub product_description_length: Option<f64>,
    pub product_photos_qty: Option<f64>,
    pub product_weight_g: Option<f64>,
    pub product_length_cm: Option<f64>,
    pub product_height_cm: Option<f64>,
    pub product_width_cm: Option<f64>,
    pub size_anomaly: bool,
    pub product_volume_cm3: Option<f64>,
}

impl SilverDataset for SilverProduct {
    const PATH: &'static str = "silver/products.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("product_id", false),
            utf8("product_category_name", false),
            float("product_name_length"),
            float("product_description_length"),
            float("product_photos_qty"),
            float("product_weight_g"),
            float("product_length_cm"),
            float("product_height_cm"),
            float("product_width_cm"),
            Field::new("size_anomaly", DataType::Boolean, false),
            float("product_volume_cm3"),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverSeller {
    pub seller_id: String,
    pub seller_zip_code_prefix: Option<String>,
    pub seller_city: Option<String>,
    /// Two-letter code or `Unknown`
    pub seller_state: String,
}

impl SilverDataset for SilverSeller {
    const PATH: &'static str = "silver/sellers.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("seller_id", false),
            utf8("seller_zip_code_prefix", true),
            utf8("seller_city", true),
            utf8("seller_state", false),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverPayment {
    pub order_id: String,
    pub payment_sequential: Option<i64>,
    pub payment_type: String,
    pub payment_installments: Option<i64>,
    pub payment_value: Option<f64>,
}

impl SilverDataset for SilverPayment {
    const PATH: &'static str = "silver/payments.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("order_id", false),
            int("payment_sequential", true),
            utf8("payment_type", false),
            int("payment_installments", true),
            float("payment_value"),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverReview {
    pub review_id: String,
    pub order_id: String,
    pub review_score: Option<i64>,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
    pub review_creation_date: Option<DateTime<Utc>>,
    pub review_answer_timestamp: Option<DateTime<Utc>>,
}

impl SilverDataset for SilverReview {
    const PATH: &'static str = "silver/reviews.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("review_id", false),
            utf8("order_id", false),
            int("review_score", true),
            utf8("review_comment_title", true),
            utf8("review_comment_message", true),
            utf8("review_creation_date", true),
            utf8("review_answer_timestamp", true),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverGeolocation {
    pub geolocation_zip_code_prefix: String,
    pub geolocation_city: String,
    pub geolocation_state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SilverDataset for SilverGeolocation {
    const PATH: &'static str = "silver/geolocation.parquet";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("geolocation_zip_code_prefix", false),
            utf8("geolocation_city", false),
            utf8("geolocation_state", false),
            float("latitude"),
            float("longitude"),
        ]))
    }
}
