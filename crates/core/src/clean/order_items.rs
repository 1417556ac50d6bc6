//! Order items cleaner

use super::Cleaned;
use super::normalize::{keep_first_by, non_empty, parse_date, parse_f64, parse_i64};
use crate::models::{RawOrderItem, SilverOrderItem};

/// Clean raw order items
///
/// Deduplicates on (order id, item sequence, product id, seller id),
/// keeping the first occurrence.
pub fn clean_order_items(raw: Vec<RawOrderItem>) -> Cleaned<SilverOrderItem> {
    let total = raw.len();
    let rows: Vec<SilverOrderItem> = raw.into_iter().filter_map(clean_order_item).collect();
    let rejected = total - rows.len();

    let rows = keep_first_by(rows, |item| {
        (
            item.order_id.clone(),
            item.order_item_id,
            item.product_id.clone(),
            item.seller_id.clone(),
        )
    });

    Cleaned { rows, rejected }
}

fn clean_order_item(raw: RawOrderItem) -> Option<SilverOrderItem> {
    Some(SilverOrderItem {
        order_id: non_empty(raw.order_id.as_deref())?.to_string(),
        order_item_id: parse_i64(raw.order_item_id.as_deref()),
        product_id: non_empty(raw.product_id.as_deref()).map(str::to_string),
        seller_id: non_empty(raw.seller_id.as_deref()).map(str::to_string),
        shipping_limit_date: parse_date(raw.shipping_limit_date.as_deref()),
        price: parse_f64(raw.price.as_deref()),
        freight_value: parse_f64(raw.freight_value.as_deref()),
    })
}
