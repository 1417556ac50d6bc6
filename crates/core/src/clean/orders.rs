//! Orders cleaner

use chrono::NaiveDate;

use super::Cleaned;
use super::normalize::{keep_last_by, non_empty, parse_date};
use crate::models::{OrderStatus, RawOrder, SilverOrder};

/// Clean raw orders
///
/// Dates are normalized to calendar days, unparsable ones become `None`.
/// Rows without an order id are rejected. Duplicated order ids keep the
/// row with the latest purchase date (stable sort, missing dates last).
pub fn clean_orders(raw: Vec<RawOrder>) -> Cleaned<SilverOrder> {
    let total = raw.len();

    let mut rows: Vec<SilverOrder> = raw.into_iter().filter_map(clean_order).collect();
    let rejected = total - rows.len();

    rows.sort_by(|a, b| match (a.order_purchase_timestamp, b.order_purchase_timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    let rows = keep_last_by(rows, |order| order.order_id.clone());

    Cleaned { rows, rejected }
}

fn clean_order(raw: RawOrder) -> Option<SilverOrder> {
    let order_id = non_empty(raw.order_id.as_deref())?.to_string();

    let purchase = parse_date(raw.order_purchase_timestamp.as_deref());
    let approved = parse_date(raw.order_approved_at.as_deref());
    let carrier = parse_date(raw.order_delivered_carrier_date.as_deref());
    let customer = parse_date(raw.order_delivered_customer_date.as_deref());
    let estimated = parse_date(raw.order_estimated_delivery_date.as_deref());

    let status = OrderStatus::from_raw(raw.order_status.as_deref());

    Some(SilverOrder {
        order_id,
        customer_id: non_empty(raw.customer_id.as_deref()).map(str::to_string),
        order_status: status,
        order_purchase_timestamp: purchase,
        order_approved_at: approved,
        order_delivered_carrier_date: carrier,
        order_delivered_customer_date: customer,
        order_estimated_delivery_date: estimated,
        order_purchase_date: purchase,
        status_flag: status.validity_flag(),
        time_anomaly: time_anomaly([purchase, approved, carrier, customer, estimated]),
        delivered_flag: u8::from(customer.is_some()),
    })
}

/// 1 when the lifecycle dates are out of order, else 0
///
/// A missing purchase date is always anomalous. Every other check compares
/// adjacent lifecycle dates and only runs when both are present, so a gap
/// in the chain never links its neighbours.
pub fn time_anomaly(dates: [Option<NaiveDate>; 5]) -> u8 {
    if dates[0].is_none() {
        return 1;
    }
    let out_of_order = dates.windows(2).any(|pair| match (pair[0], pair[1]) {
        (Some(earlier), Some(later)) => earlier > later,
        _ => false,
    });
    u8::from(out_of_order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn raw(id: &str, purchase: &str, status: &str) -> RawOrder {
        RawOrder {
            order_id: Some(id.to_string()),
            customer_id: Some(format!("c-{id}")),
            order_status: Some(status.to_string()),
            order_purchase_timestamp: Some(purchase.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_time_anomaly_rules() {
        // purchase after approval
        assert_eq!(time_anomaly([d("2018-01-02"), d("2018-01-01"), None, None, None]), 1);
        // only purchase known
        assert_eq!(time_anomaly([d("2018-01-02"), None, None, None, None]), 0);
        // purchase missing
        assert_eq!(time_anomaly([None, d("2018-01-01"), None, None, None]), 1);
        // ordered chain
        assert_eq!(
            time_anomaly([
                d("2018-01-01"),
                d("2018-01-01"),
                d("2018-01-03"),
                d("2018-01-05"),
                d("2018-01-10"),
            ]),
            0
        );
        // delivered after estimate
        assert_eq!(
            time_anomaly([d("2018-01-01"), None, None, d("2018-02-01"), d("2018-01-20")]),
            1
        );
    }

    #[test]
    fn test_missing_intermediate_date_skips_comparison() {
        // carrier before purchase, but approval missing: not compared
        assert_eq!(
            time_anomaly([d("2018-01-10"), None, d("2018-01-05"), None, None]),
            0
        );
    }

    #[test]
    fn test_clean_order_flags() {
        let mut order = raw("o1", "2017-10-02 10:56:33", "invoiced");
        order.order_delivered_customer_date = Some("2017-10-10 21:25:13".to_string());
        order.order_approved_at = Some("not a date".to_string());

        let cleaned = clean_orders(vec![order]);
        let row = &cleaned.rows[0];

        assert_eq!(row.order_status, OrderStatus::Approved);
        assert_eq!(row.status_flag, 1);
        assert_eq!(row.delivered_flag, 1);
        assert_eq!(row.order_approved_at, None);
        assert_eq!(row.order_purchase_date, d("2017-10-02"));
        assert_eq!(row.time_anomaly, 0);
    }

    #[test]
    fn test_bogus_status_is_invalid() {
        let cleaned = clean_orders(vec![raw("o1", "2017-10-02", "bogus")]);
        assert_eq!(cleaned.rows[0].order_status, OrderStatus::Invalid);
        assert_eq!(cleaned.rows[0].status_flag, 0);
    }

    #[test]
    fn test_dedup_keeps_latest_purchase() {
        let cleaned = clean_orders(vec![
            raw("o1", "2018-03-01", "shipped"),
            raw("o1", "2018-01-01", "created"),
            raw("o2", "2018-02-01", "delivered"),
        ]);

        assert_eq!(cleaned.rows.len(), 2);
        let o1 = cleaned.rows.iter().find(|r| r.order_id == "o1").unwrap();
        assert_eq!(o1.order_status, OrderStatus::Shipped);
        // sorted by purchase date
        assert_eq!(cleaned.rows[0].order_id, "o2");
    }

    #[test]
    fn test_missing_order_id_is_rejected() {
        let mut order = raw("", "2018-01-01", "created");
        order.order_id = None;
        let cleaned = clean_orders(vec![order, raw("o1", "2018-01-01", "created")]);
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rejected, 1);
    }
}
