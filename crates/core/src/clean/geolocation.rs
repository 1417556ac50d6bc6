//! Geolocation cleaner
//!
//! The raw extract holds many coordinate samples per zip prefix. They are
//! collapsed to one row per (zip prefix, city, state) with mean coordinates.

use std::collections::BTreeMap;

use super::Cleaned;
use super::normalize::{drop_duplicate_rows, non_empty, parse_f64, zip_prefix};
use crate::models::{RawGeolocation, SilverGeolocation};

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Clean raw geolocation samples
///
/// Cities are lower-cased and zip prefixes padded before grouping; states
/// are grouped as they arrive. Output is ordered by (zip prefix, city,
/// state). Rows missing any key part are rejected.
pub fn clean_geolocation(raw: Vec<RawGeolocation>) -> Cleaned<SilverGeolocation> {
    let raw = drop_duplicate_rows(raw);
    let total = raw.len();

    let mut groups: BTreeMap<(String, String, String), (Mean, Mean)> = BTreeMap::new();
    let mut grouped = 0usize;

    for row in raw {
        let (Some(zip), Some(city), Some(state)) = (
            zip_prefix(row.geolocation_zip_code_prefix.as_deref()),
            non_empty(row.geolocation_city.as_deref()).map(str::to_lowercase),
            non_empty(row.geolocation_state.as_deref()).map(str::to_string),
        ) else {
            continue;
        };
        grouped += 1;

        let (lat, lng) = groups.entry((zip, city, state)).or_default();
        lat.add(parse_f64(row.geolocation_lat.as_deref()));
        lng.add(parse_f64(row.geolocation_lng.as_deref()));
    }

    let rows = groups
        .into_iter()
        .map(|((zip, city, state), (lat, lng))| SilverGeolocation {
            geolocation_zip_code_prefix: zip,
            geolocation_city: city,
            geolocation_state: state,
            latitude: lat.value(),
            longitude: lng.value(),
        })
        .collect();

    Cleaned {
        rows,
        rejected: total - grouped,
    }
}
