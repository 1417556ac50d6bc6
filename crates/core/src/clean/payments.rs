//! Payments cleaner

use super::Cleaned;
use super::normalize::{keep_first_by, non_empty, parse_f64, parse_i64, parse_positive};
use crate::models::{RawPayment, SilverPayment};

/// Payment type used for missing or placeholder values
pub const UNKNOWN_PAYMENT_TYPE: &str = "unknown";

/// Clean raw payments
///
/// Duplicate rows are dropped first, comparing numeric columns by their
/// parsed value so `100.0` and `100.00` are the same payment. Missing or `not_defined` types
/// become `unknown`, non-positive installment counts become 1, and
/// non-positive payment values become missing.
pub fn clean_payments(raw: Vec<RawPayment>) -> Cleaned<SilverPayment> {
    let raw = keep_first_by(raw, duplicate_key);
    let total = raw.len();
    let rows: Vec<SilverPayment> = raw.into_iter().filter_map(clean_payment).collect();
    let rejected = total - rows.len();
    Cleaned { rows, rejected }
}

type PaymentKey = (Option<String>, Option<i64>, Option<String>, Option<i64>, Option<u64>);

/// Row identity before repairs; floats compare by bit pattern
fn duplicate_key(raw: &RawPayment) -> PaymentKey {
    (
        non_empty(raw.order_id.as_deref()).map(str::to_string),
        parse_i64(raw.payment_sequential.as_deref()),
        non_empty(raw.payment_type.as_deref()).map(str::to_string),
        parse_i64(raw.payment_installments.as_deref()),
        parse_f64(raw.payment_value.as_deref()).map(|v| (v + 0.0).to_bits()),
    )
}

fn clean_payment(raw: RawPayment) -> Option<SilverPayment> {
    let payment_type = match non_empty(raw.payment_type.as_deref()) {
        None | Some("not_defined") => UNKNOWN_PAYMENT_TYPE.to_string(),
        Some(t) => t.to_string(),
    };

    Some(SilverPayment {
        order_id: non_empty(raw.order_id.as_deref())?.to_string(),
        payment_sequential: parse_i64(raw.payment_sequential.as_deref()),
        payment_type,
        payment_installments: parse_i64(raw.payment_installments.as_deref()).map(|n| n.max(1)),
        payment_value: parse_positive(raw.payment_value.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(order: &str, seq: &str, kind: Option<&str>, inst: &str, value: &str) -> RawPayment {
        RawPayment {
            order_id: Some(order.to_string()),
            payment_sequential: Some(seq.to_string()),
            payment_type: kind.map(str::to_string),
            payment_installments: Some(inst.to_string()),
            payment_value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_repairs() {
        let cleaned = clean_payments(vec![
            raw("o1", "1", None, "0", "10.5"),
            raw("o2", "1", Some("not_defined"), "-1", "0"),
            raw("o3", "1", Some("credit_card"), "3", "abc"),
        ]);

        assert_eq!(cleaned.rows[0].payment_type, "unknown");
        assert_eq!(cleaned.rows[0].payment_installments, Some(1));
        assert_eq!(cleaned.rows[0].payment_value, Some(10.5));

        assert_eq!(cleaned.rows[1].payment_type, "unknown");
        assert_eq!(cleaned.rows[1].payment_installments, Some(1));
        assert_eq!(cleaned.rows[1].payment_value, None);

        assert_eq!(cleaned.rows[2].payment_type, "credit_card");
        assert_eq!(cleaned.rows[2].payment_installments, Some(3));
        assert_eq!(cleaned.rows[2].payment_value, None);
    }

    #[test]
    fn test_exact_duplicates_dropped() {
        let cleaned = clean_payments(vec![
            raw("o1", "1", Some("boleto"), "1", "10"),
            raw("o1", "1", Some("boleto"), "1", "10"),
            raw("o1", "2", Some("voucher"), "1", "5"),
        ]);
        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.rejected, 0);
    }

    #[test]
    fn test_duplicates_compare_parsed_numbers() {
        let cleaned = clean_payments(vec![
            raw("o1", "1", Some("boleto"), "1", "100.00"),
            raw("o1", "1.0", Some("boleto"), "1", "100.0"),
            raw("o1", "1", Some("boleto"), "2", "100"),
        ]);
        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.rows[0].payment_installments, Some(1));
        assert_eq!(cleaned.rows[1].payment_installments, Some(2));
    }

    #[test]
    fn test_duplicates_are_compared_before_repairs() {
        // both become unknown/1 after repair but differ in the source
        let cleaned = clean_payments(vec![
            raw("o1", "1", None, "0", "10"),
            raw("o1", "1", Some("not_defined"), "1", "10"),
        ]);
        assert_eq!(cleaned.rows.len(), 2);
    }
}
