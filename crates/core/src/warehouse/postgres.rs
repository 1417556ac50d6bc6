//! PostgreSQL warehouse

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use super::WarehouseError;
use super::schema::{ALL_TABLES, Dialect, ParamType, TableSpec, create_all_sql};
use super::sink::{KEY_SEPARATOR, SqlValue, WarehouseSink, dedupe_by_key};
use crate::config::{DEFAULT_BATCH_SIZE, redact_secrets_in_string};

type Param = Box<dyn ToSql + Sync + Send>;

/// PostgreSQL warehouse (async)
pub struct PostgresWarehouse {
    client: Client,
    schema: String,
    target: String,
    batch_size: usize,
}

impl PostgresWarehouse {
    /// Connect to a PostgreSQL database
    pub async fn connect(url: &str, schema: &str) -> Result<Self, WarehouseError> {
        let target = redact_secrets_in_string(url);
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| WarehouseError::Connection(format!("{target}: {e}")))?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self {
            client,
            schema: schema.to_string(),
            target,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set rows per insert statement
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    async fn insert_all(
        &self,
        spec: &TableSpec,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, WarehouseError> {
        let per_statement = spec.rows_per_statement(self.batch_size);
        let params: Vec<ParamType> = spec.columns.iter().map(|c| c.sql_type.param_type()).collect();

        let mut affected = 0u64;
        for chunk in rows.chunks(per_statement) {
            let sql = spec.insert_sql(&self.schema, Dialect::Postgres, chunk.len());
            let values: Vec<Param> = chunk
                .iter()
                .flat_map(|row| row.iter().zip(&params).map(|(v, p)| to_param(v, *p)))
                .collect();
            let refs: Vec<&(dyn ToSql + Sync)> = values
                .iter()
                .map(|v| v.as_ref() as &(dyn ToSql + Sync))
                .collect();
            affected += self
                .client
                .execute(sql.as_str(), &refs)
                .await
                .map_err(|e| WarehouseError::Statement(format!("{}: {e}", spec.name)))?;
        }
        Ok(affected)
    }

    async fn batch(&self, sql: &str) -> Result<(), WarehouseError> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| WarehouseError::Statement(e.to_string()))
    }
}

fn to_param(value: &SqlValue, param: ParamType) -> Param {
    match param {
        ParamType::Int => Box::new(value.as_i64()),
        ParamType::Float => Box::new(value.as_f64()),
        ParamType::Bool => Box::new(value.as_bool()),
        ParamType::Text => Box::new(value.as_text()),
        ParamType::Date => Box::new(value.as_date()),
    }
}

#[async_trait(?Send)]
impl WarehouseSink for PostgresWarehouse {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn describe(&self) -> String {
        format!("{} (schema {})", self.target, self.schema)
    }

    async fn init(&self) -> Result<(), WarehouseError> {
        self.batch(&create_all_sql(&self.schema, Dialect::Postgres))
            .await?;
        debug!(schema = %self.schema, "Provisioned PostgreSQL warehouse");
        Ok(())
    }

    async fn is_initialized(&self) -> Result<bool, WarehouseError> {
        let names: Vec<String> = ALL_TABLES.iter().map(|t| t.name.to_string()).collect();
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_schema::text = $1::text AND table_name::text = ANY($2::text[])",
                &[&self.schema, &names],
            )
            .await
            .map_err(|e| WarehouseError::Statement(e.to_string()))?;
        let count: i64 = row.get(0);
        Ok(count as usize == ALL_TABLES.len())
    }

    async fn write(&self, spec: &TableSpec, rows: &[Vec<SqlValue>]) -> Result<u64, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let rows = dedupe_by_key(spec, rows);

        self.batch("BEGIN").await?;
        match self.insert_all(spec, &rows).await {
            Ok(affected) => {
                self.batch("COMMIT").await?;
                debug!(table = spec.name, rows = rows.len(), affected, "PostgreSQL insert");
                Ok(affected)
            }
            Err(e) => {
                if let Err(rollback) = self.batch("ROLLBACK").await {
                    error!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
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

        let rows = self
            .client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| WarehouseError::Statement(e.to_string()))?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let parts: Vec<String> = (0..width)
                .map(|i| row.get::<_, Option<String>>(i).unwrap_or_default())
                .collect();
            map.insert(parts.join(KEY_SEPARATOR), row.get::<_, i64>(width));
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
        let rows = self
            .client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| WarehouseError::Statement(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }

    async fn row_count(&self, spec: &TableSpec) -> Result<u64, WarehouseError> {
        let row = self
            .client
            .query_one(
                format!("SELECT COUNT(*) FROM {}", spec.qualified(&self.schema)).as_str(),
                &[],
            )
            .await
            .map_err(|e| WarehouseError::Statement(e.to_string()))?;
        Ok(row.get::<_, i64>(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use chrono::NaiveDate;
    use tokio_postgres::types::{IsNull, Type};

    fn encode(value: &SqlValue, param: ParamType, ty: &Type) -> (bool, Vec<u8>) {
        let mut buf = BytesMut::new();
        let is_null = to_param(value, param).to_sql_checked(ty, &mut buf).unwrap();
        (matches!(is_null, IsNull::Yes), buf.to_vec())
    }

    #[test]
    fn test_date_param_encodes_days_since_2000() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let (is_null, bytes) = encode(&SqlValue::Date(date), ParamType::Date, &Type::DATE);
        assert!(!is_null);
        assert_eq!(bytes, 6575i32.to_be_bytes().to_vec());

        // text keys are parsed into dates too
        let (_, from_text) = encode(
            &SqlValue::Text("2018-01-01".into()),
            ParamType::Date,
            &Type::DATE,
        );
        assert_eq!(from_text, bytes);
    }

    #[test]
    fn test_int_and_float_params() {
        let (is_null, bytes) = encode(&SqlValue::Int(42), ParamType::Int, &Type::INT8);
        assert!(!is_null);
        assert_eq!(bytes, 42i64.to_be_bytes().to_vec());

        // integers bound into a float column are widened
        let (is_null, bytes) = encode(&SqlValue::Int(3), ParamType::Float, &Type::FLOAT8);
        assert!(!is_null);
        assert_eq!(bytes, 3.0f64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_null_params_encode_as_null() {
        for (param, ty) in [
            (ParamType::Int, Type::INT8),
            (ParamType::Float, Type::FLOAT8),
            (ParamType::Date, Type::DATE),
            (ParamType::Text, Type::TEXT),
            (ParamType::Bool, Type::BOOL),
        ] {
            let (is_null, bytes) = encode(&SqlValue::Null, param, &ty);
            assert!(is_null, "{ty}");
            assert!(bytes.is_empty());
        }
    }

    #[test]
    fn test_param_rejects_mismatched_column_type() {
        let mut buf = BytesMut::new();
        let param = to_param(&SqlValue::Int(1), ParamType::Int);
        assert!(param.to_sql_checked(&Type::DATE, &mut buf).is_err());
    }
}
