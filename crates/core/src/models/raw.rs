//! Raw extract records
//!
//! One struct per source file. Every field is an optional string: values are
//! parsed and repaired by the cleaners, never at decode time.

use serde::Deserialize;

/// `olist_orders_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub order_status: Option<String>,
    pub order_purchase_timestamp: Option<String>,
    pub order_approved_at: Option<String>,
    pub order_delivered_carrier_date: Option<String>,
    pub order_delivered_customer_date: Option<String>,
    pub order_estimated_delivery_date: Option<String>,
}

/// `olist_customers_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawCustomer {
    pub customer_id: Option<String>,
    pub customer_unique_id: Option<String>,
    pub customer_zip_code_prefix: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
}

/// `olist_order_items_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawOrderItem {
    pub order_id: Option<String>,
    pub order_item_id: Option<String>,
    pub product_id: Option<String>,
    pub seller_id: Option<String>,
    pub shipping_limit_date: Option<String>,
    pub price: Option<String>,
    pub freight_value: Option<String>,
}

/// `olist_products_dataset.csv`
///
/// The extract misspells two headers (`..._lenght`); both spellings decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    pub product_id: Option<String>,
    pub product_category_name: Option<String>,
    #[serde(alias = "product_name_lenght")]
    pub product_name_length: Option<String>,
    #[serde(alias = "product_description_lenght")]
    pub product_description_length: Option<String>,
    pub product_photos_qty: Option<String>,
    pub product_weight_g: Option<String>,
    pub product_length_cm: Option<String>,
    pub product_height_cm: Option<String>,
    pub product_width_cm: Option<String>,
}

/// `product_category_name_translation.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawCategoryTranslation {
    pub product_category_name: Option<String>,
    pub product_category_name_english: Option<String>,
}

/// `olist_sellers_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawSeller {
    pub seller_id: Option<String>,
    pub seller_zip_code_prefix: Option<String>,
    pub seller_city: Option<String>,
    pub seller_state: Option<String>,
}

/// `olist_order_payments_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawPayment {
    pub order_id: Option<String>,
    pub payment_sequential: Option<String>,
    pub payment_type: Option<String>,
    pub payment_installments: Option<String>,
    pub payment_value: Option<String>,
}

/// `olist_order_reviews_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawReview {
    pub review_id: Option<String>,
    pub order_id: Option<String>,
    pub review_score: Option<String>,
    pub review_comment_title: Option<String>,
    pub review_comment_message: Option<String>,
    pub review_creation_date: Option<String>,
    pub review_answer_timestamp: Option<String>,
}

/// `olist_geolocation_dataset.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct RawGeolocation {
    pub geolocation_zip_code_prefix: Option<String>,
    pub geolocation_lat: Option<String>,
    pub geolocation_lng: Option<String>,
    pub geolocation_city: Option<String>,
    pub geolocation_state: Option<String>,
}
