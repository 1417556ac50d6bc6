//! Customers cleaner

use super::normalize::{keep_first_by, non_empty, zip_prefix};
use crate::models::{BrazilianState, RawCustomer, SilverCustomer};

/// The two customer artifacts
#[derive(Debug, Clone, Default)]
pub struct CleanedCustomers {
    /// Deduplicated on the per-order `customer_id` (keep first)
    pub customers: Vec<SilverCustomer>,
    /// Deduplicated on the persistent `customer_unique_id` (keep first);
    /// a missing unique id counts as one key
    pub unique_customers: Vec<SilverCustomer>,
    /// Rows without a customer id
    pub rejected: usize,
}

/// Clean raw customers into both artifacts
pub fn clean_customers(raw: Vec<RawCustomer>) -> CleanedCustomers {
    let total = raw.len();
    let rows: Vec<SilverCustomer> = raw.into_iter().filter_map(clean_customer).collect();
    let rejected = total - rows.len();

    // rows without a unique id share one key, so the first of them is kept
    let unique_customers = keep_first_by(rows.clone(), |c| c.customer_unique_id.clone());
    let customers = keep_first_by(rows, |c| c.customer_id.clone());

    CleanedCustomers {
        customers,
        unique_customers,
        rejected,
    }
}

fn clean_customer(raw: RawCustomer) -> Option<SilverCustomer> {
    let customer_id = non_empty(raw.customer_id.as_deref())?.to_string();
    let state = non_empty(raw.customer_state.as_deref()).map(str::to_uppercase);
    let state_name = state
        .as_deref()
        .and_then(BrazilianState::from_code)
        .map(|s| s.full_name().to_string());

    Some(SilverCustomer {
        customer_id,
        customer_unique_id: non_empty(raw.customer_unique_id.as_deref()).map(str::to_string),
        customer_zip_code_prefix: zip_prefix(raw.customer_zip_code_prefix.as_deref()),
        customer_city: non_empty(raw.customer_city.as_deref()).map(str::to_lowercase),
        customer_state: state,
        customer_state_name: state_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, unique: &str, zip: &str, city: &str, state: &str) -> RawCustomer {
        RawCustomer {
            customer_id: Some(id.to_string()),
            customer_unique_id: Some(unique.to_string()),
            customer_zip_code_prefix: Some(zip.to_string()),
            customer_city: Some(city.to_string()),
            customer_state: Some(state.to_string()),
        }
    }

    #[test]
    fn test_normalizes_fields() {
        let cleaned = clean_customers(vec![raw("c1", "u1", "1151", " Sao Paulo ", "sp")]);
        let row = &cleaned.customers[0];
        assert_eq!(row.customer_zip_code_prefix.as_deref(), Some("01151"));
        assert_eq!(row.customer_city.as_deref(), Some("sao paulo"));
        assert_eq!(row.customer_state.as_deref(), Some("SP"));
        assert_eq!(row.customer_state_name.as_deref(), Some("São Paulo"));
    }

    #[test]
    fn test_unknown_state_has_no_name() {
        let cleaned = clean_customers(vec![raw("c1", "u1", "12345", "x", "ZZ")]);
        assert_eq!(cleaned.customers[0].customer_state.as_deref(), Some("ZZ"));
        assert_eq!(cleaned.customers[0].customer_state_name, None);
    }

    #[test]
    fn test_two_artifacts_dedup_on_different_keys() {
        let cleaned = clean_customers(vec![
            raw("c1", "u1", "1", "a", "SP"),
            raw("c2", "u1", "2", "b", "RJ"),
            raw("c1", "u2", "3", "c", "MG"),
        ]);

        let ids: Vec<_> = cleaned.customers.iter().map(|c| c.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(cleaned.customers[0].customer_city.as_deref(), Some("a"));

        let unique: Vec<_> = cleaned
            .unique_customers
            .iter()
            .map(|c| c.customer_id.as_str())
            .collect();
        assert_eq!(unique, vec!["c1", "c1"]);
        assert_eq!(cleaned.unique_customers[1].customer_unique_id.as_deref(), Some("u2"));
    }

    #[test]
    fn test_missing_unique_id_keeps_first_row() {
        let mut a = raw("c1", "", "1", "a", "SP");
        a.customer_unique_id = None;
        let b = raw("c2", " ", "2", "b", "RJ");
        let c = raw("c3", "u3", "3", "c", "MG");

        let cleaned = clean_customers(vec![a, b, c]);
        assert_eq!(cleaned.customers.len(), 3);

        let unique: Vec<_> = cleaned
            .unique_customers
            .iter()
            .map(|c| c.customer_id.as_str())
            .collect();
        assert_eq!(unique, vec!["c1", "c3"]);
        assert_eq!(cleaned.unique_customers[0].customer_unique_id, None);
    }
}
