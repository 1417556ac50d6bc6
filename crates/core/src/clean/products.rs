//! Products cleaner

use std::collections::HashMap;

use super::Cleaned;
use super::normalize::{keep_first_by, non_empty, parse_positive};
use crate::models::{RawCategoryTranslation, RawProduct, SilverProduct};

/// Category used when the source has none
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Products lighter than this many grams are flagged
pub const SIZE_ANOMALY_GRAMS: f64 = 50.0;

/// Build the category translation map; the first row for a name wins
pub fn category_translations(rows: Vec<RawCategoryTranslation>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for row in rows {
        if let (Some(name), Some(english)) = (
            non_empty(row.product_category_name.as_deref()),
            non_empty(row.product_category_name_english.as_deref()),
        ) {
            map.entry(name.to_string())
                .or_insert_with(|| english.to_string());
        }
    }
    map
}

/// Clean raw products
///
/// Without a translation map the source category names are kept.
pub fn clean_products(
    raw: Vec<RawProduct>,
    translations: Option<&HashMap<String, String>>,
) -> Cleaned<SilverProduct> {
    let total = raw.len();
    let rows: Vec<SilverProduct> = raw
        .into_iter()
        .filter_map(|row| clean_product(row, translations))
        .collect();
    let rejected = total - rows.len();

    let rows = keep_first_by(rows, |p| p.product_id.clone());
    Cleaned { rows, rejected }
}

fn clean_product(
    raw: RawProduct,
    translations: Option<&HashMap<String, String>>,
) -> Option<SilverProduct> {
    let product_id = non_empty(raw.product_id.as_deref())?.to_string();

    let category = non_empty(raw.product_category_name.as_deref()).unwrap_or(UNKNOWN_CATEGORY);
    let category = translations
        .and_then(|t| t.get(category))
        .map(String::as_str)
        .unwrap_or(category)
        .to_string();

    let weight = parse_positive(raw.product_weight_g.as_deref());
    let length = parse_positive(raw.product_length_cm.as_deref());
    let height = parse_positive(raw.product_height_cm.as_deref());
    let width = parse_positive(raw.product_width_cm.as_deref());

    Some(SilverProduct {
        product_id,
        product_category_name: category,
        product_name_length: parse_positive(raw.product_name_length.as_deref()),
        product_description_length: parse_positive(raw.product_description_length.as_deref()),
        product_photos_qty: parse_positive(raw.product_photos_qty.as_deref()),
        product_weight_g: weight,
        product_length_cm: length,
        product_height_cm: height,
        product_width_cm: width,
        size_anomaly: is_size_anomaly(weight),
        product_volume_cm3: volume(length, height, width),
    })
}

/// True when the weight is known and below the threshold
pub fn is_size_anomaly(weight_g: Option<f64>) -> bool {
    weight_g.is_some_and(|w| w < SIZE_ANOMALY_GRAMS)
}

/// length × height × width, `None` if any factor is missing
pub fn volume(length: Option<f64>, height: Option<f64>, width: Option<f64>) -> Option<f64> {
    Some(length? * height? * width?)
}
