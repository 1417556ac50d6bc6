//! Embedded DuckDB warehouse

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use ::duckdb::types::Value;
use ::duckdb::{Connection, params_from_iter};
use async_trait::async_trait;
use tracing::debug;

use super::WarehouseError;
use super::schema::{ALL_TABLES, Dialect, ParamType, TableSpec, create_all_sql};
use super::sink::{KEY_SEPARATOR, SqlValue, WarehouseSink, dedupe_by_key};
use crate::config::DEFAULT_BATCH_SIZE;

/// DuckDB file or in-memory database
pub struct DuckDbWarehouse {
    conn: Mutex<Connection>,
    schema: String,
    path: Option<String>,
    batch_size: usize,
}

impl DuckDbWarehouse {
    /// Open or create a database file
    pub fn open(path: &Path, schema: &str) -> Result<Self, WarehouseError> {
        let conn = Connection::open(path)
            .map_err(|e| WarehouseError::Connection(format!("{}: {e}", path.display())))?;
        Ok(Self::with_connection(conn, schema, Some(path.display().to_string())))
    }

    /// Open an in-memory database (for testing)
    pub fn memory(schema: &str) -> Result<Self, WarehouseError> {
        let conn =
            Connection::open_in_memory().map_err(|e| WarehouseError::Connection(e.to_string()))?;
        Ok(Self::with_connection(conn, schema, None))
    }

    fn with_connection(conn: Connection, schema: &str, path: Option<String>) -> Self {
        Self {
            conn: Mutex::new(conn),
            schema: schema.to_string(),
            path,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set rows per insert statement
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, WarehouseError> {
        self.conn
            .lock()
            .map_err(|_| WarehouseError::Connection("DuckDB connection poisoned".to_string()))
    }
}

fn to_value(value: &SqlValue, param: ParamType) -> Value {
    let converted = match param {
        ParamType::Int => value.as_i64().map(Value::BigInt),
        ParamType::Float => value.as_f64().map(Value::Double),
        ParamType::Bool => value.as_bool().map(Value::Boolean),
        ParamType::Text | ParamType::Date => value.as_text().map(Value::Text),
    };
    converted.unwrap_or(Value::Null)
}

#[async_trait(?Send)]
impl WarehouseSink for DuckDbWarehouse {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("duckdb://{path} (schema {})", self.schema),
            None => format!("duckdb://:memory: (schema {})", self.schema),
        }
    }

    async fn init(&self) -> Result<(), WarehouseError> {
        let conn = self.lock()?;
        conn.execute_batch(&create_all_sql(&self.schema, Dialect::DuckDb))?;
        debug!(schema = %self.schema, "Provisioned DuckDB warehouse");
        Ok(())
    }

    async fn is_initialized(&self) -> Result<bool, WarehouseError> {
        let conn = self.lock()?;
        let names: Vec<String> = ALL_TABLES.iter().map(|t| format!("'{}'", t.name)).collect();
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name IN ({})",
            names.join(", ")
        );
        let count: i64 = conn.query_row(&sql, [&self.schema], |row| row.get(0))?;
        Ok(count as usize == ALL_TABLES.len())
    }

    async fn write(&self, spec: &TableSpec, rows: &[Vec<SqlValue>]) -> Result<u64, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let rows = dedupe_by_key(spec, rows);
        let per_statement = spec.rows_per_statement(self.batch_size);
        let params: Vec<ParamType> = spec.columns.iter().map(|c| c.sql_type.param_type()).collect();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut affected = 0u64;
        for chunk in rows.chunks(per_statement) {
            let sql = spec.insert_sql(&self.schema, Dialect::DuckDb, chunk.len());
            let values: Vec<Value> = chunk
                .iter()
                .flat_map(|row| row.iter().zip(&params).map(|(v, p)| to_value(v, *p)))
                .collect();
            affected += tx.execute(&sql, params_from_iter(values))? as u64;
        }
        tx.commit()?;

        debug!(table = spec.name, rows = rows.len(), affected, "DuckDB insert");
        Ok(affected)
    }

    async fn key_map(&self, spec: &TableSpec) -> Result<HashMap<String, i64>, WarehouseError> {
        let sk = spec.surrogate_key.ok_or_else(|| {
            WarehouseError::Statement(format!("{} has no surrogate key", spec.name))
        })?;
        let keys: Vec<String> = spec
            .natural_key
            .iter()
            .map(|k| format!("CAST({k} AS VARCHAR)"))
            .collect();
        let sql = format!(
            "SELECT {}, {sk} FROM {}",
            keys.join(", "),
            spec.qualified(&self.schema)
        );
        let width = spec.natural_key.len();

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let mut parts = Vec::with_capacity(width);
            for i in 0..width {
                parts.push(row.get::<_, Option<String>>(i)?.unwrap_or_default());
            }
            let sk: i64 = row.get(width)?;
            Ok((parts.join(KEY_SEPARATOR), sk))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, sk) = row?;
            map.insert(key, sk);
        }
        Ok(map)
    }

    async fn existing_keys(
        &self,
        spec: &TableSpec,
        column: &str,
    ) -> Result<HashSet<String>, WarehouseError> {
        super::schema::validate_identifier(column).map_err(WarehouseError::InvalidIdentifier)?;
        let sql = format!(
            "SELECT DISTINCT CAST({column} AS VARCHAR) FROM {} WHERE {column} IS NOT NULL",
            spec.qualified(&self.schema)
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for key in rows {
            keys.insert(key?);
        }
        Ok(keys)
    }

    async fn row_count(&self, spec: &TableSpec) -> Result<u64, WarehouseError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", spec.qualified(&self.schema)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
