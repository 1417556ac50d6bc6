//! Sellers cleaner

use super::Cleaned;
use super::normalize::{keep_first_by, non_empty, title_case, zip_prefix};
use crate::models::{RawSeller, SilverSeller};

/// State used when the source code is not two characters
pub const UNKNOWN_STATE: &str = "Unknown";

/// Clean raw sellers, keeping the first row per seller id
pub fn clean_sellers(raw: Vec<RawSeller>) -> Cleaned<SilverSeller> {
    let total = raw.len();
    let with_id: Vec<RawSeller> = raw
        .into_iter()
        .filter(|s| non_empty(s.seller_id.as_deref()).is_some())
        .collect();
    let rejected = total - with_id.len();

    let rows = keep_first_by(with_id, |s| {
        non_empty(s.seller_id.as_deref()).map(str::to_string)
    })
    .into_iter()
    .filter_map(clean_seller)
    .collect();

    Cleaned { rows, rejected }
}

fn clean_seller(raw: RawSeller) -> Option<SilverSeller> {
    let state = non_empty(raw.seller_state.as_deref())
        .map(str::to_uppercase)
        .filter(|s| s.chars().count() == 2)
        .unwrap_or_else(|| UNKNOWN_STATE.to_string());

    Some(SilverSeller {
        seller_id: non_empty(raw.seller_id.as_deref())?.to_string(),
        seller_zip_code_prefix: zip_prefix(raw.seller_zip_code_prefix.as_deref()),
        seller_city: non_empty(raw.seller_city.as_deref()).map(title_case),
        seller_state: state,
    })
}
