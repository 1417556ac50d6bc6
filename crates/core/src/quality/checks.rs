//! Check primitives
//!
//! Pure functions over slices; none of them fails on empty input.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{SilverOrderItem, SilverPayment};

/// Violations found by one check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Violations {
    pub count: u64,
    /// First offending keys in input order
    pub samples: Vec<String>,
}

impl Violations {
    fn record(&mut self, sample: Option<&str>, limit: usize) {
        self.count += 1;
        if let Some(key) = sample {
            if self.samples.len() < limit {
                self.samples.push(key.to_string());
            }
        }
    }
}

/// Count rows whose reference is missing from `keys`
///
/// A missing reference counts as a violation. `sample` selects the key
/// reported for an offending row.
pub fn missing_references<R>(
    rows: &[R],
    reference: impl Fn(&R) -> Option<&str>,
    sample: impl Fn(&R) -> Option<&str>,
    keys: &HashSet<&str>,
    limit: usize,
) -> Violations {
    let mut violations = Violations::default();
    for row in rows {
        let resolved = reference(row).is_some_and(|key| keys.contains(key));
        if !resolved {
            violations.record(sample(row), limit);
        }
    }
    violations
}

/// Percentage of rows whose zip prefix is covered, rounded to two decimals
///
/// Returns the uncovered rows as violations. An empty input is fully covered.
pub fn zip_coverage<R>(
    rows: &[R],
    zip: impl Fn(&R) -> Option<&str>,
    id: impl Fn(&R) -> Option<&str>,
    covered: &HashSet<&str>,
    limit: usize,
) -> (Violations, f64) {
    let violations = missing_references(rows, zip, id, covered, limit);
    if rows.is_empty() {
        return (violations, 100.0);
    }
    let covered_rows = rows.len() as u64 - violations.count;
    let rate = covered_rows as f64 * 100.0 / rows.len() as f64;
    (violations, round2(rate))
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-order comparison of item and payment totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountMismatch {
    pub order_id: String,
    /// Sum of price plus freight over the order's items
    pub items_total: f64,
    /// Sum of payment values over the order's payments
    pub payments_total: f64,
    /// Absolute difference
    pub diff: f64,
}

/// Orders whose item total and payment total differ by more than `tolerance`
///
/// An order present on one side only has a zero total on the other side.
/// Missing amounts count as zero. Results are ordered by order id.
pub fn amount_mismatches(
    items: &[SilverOrderItem],
    payments: &[SilverPayment],
    tolerance: f64,
) -> Vec<AmountMismatch> {
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

    for item in items {
        let entry = totals.entry(item.order_id.as_str()).or_default();
        entry.0 += item.price.unwrap_or(0.0) + item.freight_value.unwrap_or(0.0);
    }
    for payment in payments {
        let entry = totals.entry(payment.order_id.as_str()).or_default();
        entry.1 += payment.payment_value.unwrap_or(0.0);
    }

    totals
        .into_iter()
        .filter_map(|(order_id, (items_total, payments_total))| {
            let diff = (items_total - payments_total).abs();
            (diff > tolerance).then(|| AmountMismatch {
                order_id: order_id.to_string(),
                items_total,
                payments_total,
                diff,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(order: &str, price: f64, freight: f64) -> SilverOrderItem {
        SilverOrderItem {
            order_id: order.to_string(),
            order_item_id: Some(1),
            product_id: None,
            seller_id: None,
            shipping_limit_date: None,
            price: Some(price),
            freight_value: Some(freight),
        }
    }

    fn payment(order: &str, value: Option<f64>) -> SilverPayment {
        SilverPayment {
            order_id: order.to_string(),
            payment_sequential: Some(1),
            payment_type: "boleto".to_string(),
            payment_installments: Some(1),
            payment_value: value,
        }
    }

    #[test]
    fn test_missing_references_counts_none_but_samples_present_keys() {
        let rows = vec![Some("a"), None, Some("x"), Some("b")];
        let keys: HashSet<&str> = ["a", "b"].into_iter().collect();
        let v = missing_references(&rows, |r| *r, |r| *r, &keys, 5);
        assert_eq!(v.count, 2);
        assert_eq!(v.samples, vec!["x".to_string()]);
    }

    #[test]
    fn test_sample_limit() {
        let rows: Vec<String> = (0..10).map(|i| format!("k{i}")).collect();
        let keys = HashSet::new();
        let v = missing_references(&rows, |r| Some(r.as_str()), |r| Some(r.as_str()), &keys, 5);
        assert_eq!(v.count, 10);
        assert_eq!(v.samples.len(), 5);
        assert_eq!(v.samples[0], "k0");
    }

    #[test]
    fn test_zip_coverage() {
        let rows = vec![("c1", "01000"), ("c2", "02000"), ("c3", "03000")];
        let covered: HashSet<&str> = ["01000", "02000"].into_iter().collect();
        let (v, rate) = zip_coverage(&rows, |r| Some(r.1), |r| Some(r.0), &covered, 5);
        assert_eq!(v.count, 1);
        assert_eq!(v.samples, vec!["c3".to_string()]);
        assert_eq!(rate, 66.67);

        let empty: Vec<(&str, &str)> = Vec::new();
        let (v, rate) = zip_coverage(&empty, |r| Some(r.1), |r| Some(r.0), &covered, 5);
        assert_eq!(v.count, 0);
        assert_eq!(rate, 100.0);
    }

    #[test]
    fn test_amount_mismatch() {
        let items = vec![item("o1", 90.0, 10.0), item("o2", 50.0, 0.0)];
        let matched = amount_mismatches(&items[..1], &[payment("o1", Some(100.0))], 0.01);
        assert!(matched.is_empty());

        let mismatched = amount_mismatches(&items[..1], &[payment("o1", Some(90.0))], 0.01);
        assert_eq!(mismatched.len(), 1);
        assert_eq!(mismatched[0].diff, 10.0);
    }

    #[test]
    fn test_one_sided_orders_count_as_zero() {
        let items = vec![item("o2", 50.0, 0.0)];
        let payments = vec![payment("o1", Some(20.0)), payment("o3", None)];
        let result = amount_mismatches(&items, &payments, 0.01);
        let ids: Vec<_> = result.iter().map(|m| m.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2"]);
        assert_eq!(result[0].items_total, 0.0);
        assert_eq!(result[1].payments_total, 0.0);
    }
}
