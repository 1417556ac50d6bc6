//! Relational sink abstraction

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::WarehouseError;
use super::schema::TableSpec;

/// Separator of composite natural keys in [`WarehouseSink::key_map`]
pub const KEY_SEPARATOR: &str = "|";

/// A value bound into an insert statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Textual form used for key comparison; matches `CAST(col AS VARCHAR)`
    pub fn key_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::Text(v) => v.clone(),
            SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// As an integer, truncating floats
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Float(v) => Some(v.trunc() as i64),
            SqlValue::Bool(v) => Some(i64::from(*v)),
            SqlValue::Text(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Int(v) => Some(*v as f64),
            SqlValue::Float(v) => Some(*v),
            SqlValue::Text(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            other => Some(other.key_text()),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            SqlValue::Date(d) => Some(*d),
            SqlValue::Text(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map(SqlValue::Text).unwrap_or(SqlValue::Null)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        value.map(SqlValue::Int).unwrap_or(SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(value: Option<f64>) -> Self {
        value.map(SqlValue::Float).unwrap_or(SqlValue::Null)
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(value: Option<bool>) -> Self {
        value.map(SqlValue::Bool).unwrap_or(SqlValue::Null)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

/// Join the natural key of a row into one lookup key
pub fn row_key(spec: &TableSpec, row: &[SqlValue]) -> String {
    spec.key_indices()
        .iter()
        .map(|i| row.get(*i).map(SqlValue::key_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Keep the last row per natural key, preserving first-seen order
///
/// A single statement must not touch the same key twice.
pub fn dedupe_by_key(spec: &TableSpec, rows: &[Vec<SqlValue>]) -> Vec<Vec<SqlValue>> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Vec<SqlValue>> = Vec::with_capacity(rows.len());
    for row in rows {
        let key = row_key(spec, row);
        match position.get(&key) {
            Some(&i) => out[i] = row.clone(),
            None => {
                position.insert(key, out.len());
                out.push(row.clone());
            }
        }
    }
    out
}

/// Upsert-capable relational store holding the star schema
///
/// Rows passed to [`write`](WarehouseSink::write) follow the column order of
/// the [`TableSpec`]. Every call to `write` runs in its own transaction.
#[async_trait(?Send)]
pub trait WarehouseSink: Send + Sync {
    /// Schema holding the tables
    fn schema(&self) -> &str;

    /// Human readable target, without credentials
    fn describe(&self) -> String;

    /// Create the schema and every table if absent
    async fn init(&self) -> Result<(), WarehouseError>;

    /// Check that every table exists
    async fn is_initialized(&self) -> Result<bool, WarehouseError>;

    /// Insert rows with the table's conflict policy, returning affected rows
    async fn write(&self, spec: &TableSpec, rows: &[Vec<SqlValue>]) -> Result<u64, WarehouseError>;

    /// Natural key to surrogate key for a dimension
    ///
    /// Composite natural keys are joined with [`KEY_SEPARATOR`].
    async fn key_map(&self, spec: &TableSpec) -> Result<HashMap<String, i64>, WarehouseError>;

    /// Distinct non-null values of a column
    async fn existing_keys(
        &self,
        spec: &TableSpec,
        column: &str,
    ) -> Result<HashSet<String>, WarehouseError>;

    async fn row_count(&self, spec: &TableSpec) -> Result<u64, WarehouseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::schema::{DIM_SELLER, FACT_PAYMENTS};

    #[test]
    fn test_key_text_matches_sql_casts() {
        let date = NaiveDate::from_ymd_opt(2018, 3, 9).unwrap();
        assert_eq!(SqlValue::Date(date).key_text(), "2018-03-09");
        assert_eq!(SqlValue::Int(3).key_text(), "3");
        assert_eq!(SqlValue::Null.key_text(), "");
    }

    #[test]
    fn test_row_key_composite() {
        let row = vec![
            SqlValue::from("o1"),
            SqlValue::Int(2),
            SqlValue::from("boleto"),
            SqlValue::Int(1),
            SqlValue::Float(10.0),
        ];
        assert_eq!(row_key(&FACT_PAYMENTS, &row), "o1|2");
    }

    #[test]
    fn test_dedupe_keeps_last_in_first_position() {
        let rows = vec![
            vec![SqlValue::from("s1"), SqlValue::Null, SqlValue::from("A"), SqlValue::from("SP")],
            vec![SqlValue::from("s2"), SqlValue::Null, SqlValue::from("B"), SqlValue::from("RJ")],
            vec![SqlValue::from("s1"), SqlValue::Null, SqlValue::from("C"), SqlValue::from("MG")],
        ];
        let deduped = dedupe_by_key(&DIM_SELLER, &rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0][2], SqlValue::from("C"));
        assert_eq!(deduped[1][0], SqlValue::from("s2"));
    }
}
