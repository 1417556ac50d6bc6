//! Warehouse table definitions
//!
//! Every table is described once as a [`TableSpec`]; DDL and batched
//! `INSERT ... ON CONFLICT` statements for both dialects are generated from it.

/// Maximum number of bind parameters in one statement
pub const MAX_PARAMS: usize = 65_535;

/// SQL dialect of a warehouse backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DuckDb,
    Postgres,
}

/// Column types used by the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Int,
    Double,
    /// Unconstrained decimal
    Numeric,
    /// `NUMERIC(10,2)`
    Money,
    Varchar(u16),
    Text,
    Date,
    Boolean,
}

impl SqlType {
    /// Column type in DDL
    pub fn ddl(&self) -> String {
        match self {
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Int => "INTEGER".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Numeric => "NUMERIC".to_string(),
            SqlType::Money => "NUMERIC(10,2)".to_string(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
        }
    }

    /// Type of the bound parameter before it is cast to the column type
    pub fn param_type(&self) -> ParamType {
        match self {
            SqlType::BigInt | SqlType::Int => ParamType::Int,
            SqlType::Double | SqlType::Numeric | SqlType::Money => ParamType::Float,
            SqlType::Varchar(_) | SqlType::Text => ParamType::Text,
            SqlType::Date => ParamType::Date,
            SqlType::Boolean => ParamType::Bool,
        }
    }
}

/// Wire type of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Text,
    Date,
    Bool,
}

impl ParamType {
    fn sql(&self) -> &'static str {
        match self {
            ParamType::Int => "BIGINT",
            ParamType::Float => "DOUBLE PRECISION",
            ParamType::Text => "TEXT",
            ParamType::Date => "DATE",
            ParamType::Bool => "BOOLEAN",
        }
    }
}

/// A column of a warehouse table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    /// Referenced `(table, column)`
    pub references: Option<(&'static str, &'static str)>,
}

const fn col(name: &'static str, sql_type: SqlType) -> Column {
    Column {
        name,
        sql_type,
        references: None,
    }
}

const fn fk(name: &'static str, table: &'static str, column: &'static str) -> Column {
    Column {
        name,
        sql_type: SqlType::BigInt,
        references: Some((table, column)),
    }
}

/// What happens when an inserted row collides on the natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Insert-once: the existing row is left untouched
    DoNothing,
    /// Upsert: overwrite the listed mutable columns
    UpdateColumns(&'static [&'static str]),
}

/// Static description of a warehouse table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// Warehouse-issued key, `None` when the natural key is the primary key
    pub surrogate_key: Option<&'static str>,
    pub natural_key: &'static [&'static str],
    /// Insertable columns, natural key columns included
    pub columns: &'static [Column],
    pub conflict: ConflictPolicy,
}

impl TableSpec {
    /// Schema-qualified table name
    pub fn qualified(&self, schema: &str) -> String {
        format!("{schema}.{}", self.name)
    }

    /// Positions of the natural key columns within `columns`
    pub fn key_indices(&self) -> Vec<usize> {
        self.natural_key
            .iter()
            .filter_map(|key| self.columns.iter().position(|c| c.name == *key))
            .collect()
    }

    /// Rows per statement for the given batch size
    pub fn rows_per_statement(&self, batch_size: usize) -> usize {
        let by_params = MAX_PARAMS / self.columns.len().max(1);
        batch_size.clamp(1, by_params.max(1))
    }

    fn sequence_name(&self, schema: &str, surrogate: &str) -> String {
        format!("{schema}.{}_{surrogate}_seq", self.name)
    }

    /// `CREATE` statements for this table
    pub fn create_sql(&self, schema: &str, dialect: Dialect) -> String {
        let mut out = String::new();
        let mut lines = Vec::new();

        if let Some(sk) = self.surrogate_key {
            match dialect {
                Dialect::Postgres => lines.push(format!("    {sk} BIGSERIAL PRIMARY KEY")),
                Dialect::DuckDb => {
                    let seq = self.sequence_name(schema, sk);
                    out.push_str(&format!("CREATE SEQUENCE IF NOT EXISTS {seq} START 1;\n"));
                    lines.push(format!(
                        "    {sk} BIGINT PRIMARY KEY DEFAULT nextval('{seq}')"
                    ));
                }
            }
        }

        for column in self.columns {
            let mut line = format!("    {} {}", column.name, column.sql_type.ddl());
            if let (Dialect::Postgres, Some((table, target))) = (dialect, column.references) {
                line.push_str(&format!(" REFERENCES {schema}.{table}({target})"));
            }
            lines.push(line);
        }

        let key = self.natural_key.join(", ");
        if self.surrogate_key.is_some() {
            lines.push(format!("    UNIQUE ({key})"));
        } else {
            lines.push(format!("    PRIMARY KEY ({key})"));
        }

        out.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            self.qualified(schema),
            lines.join(",\n")
        ));
        out
    }

    /// Multi-row insert with the table's conflict policy
    pub fn insert_sql(&self, schema: &str, dialect: Dialect, rows: usize) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let width = self.columns.len();

        let tuples: Vec<String> = (0..rows)
            .map(|row| {
                let values: Vec<String> = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| placeholder(dialect, row * width + i + 1, c.sql_type))
                    .collect();
                format!("({})", values.join(", "))
            })
            .collect();

        let conflict = match self.conflict {
            ConflictPolicy::DoNothing => "DO NOTHING".to_string(),
            ConflictPolicy::UpdateColumns(cols) => {
                let sets: Vec<String> = cols
                    .iter()
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect();
                format!("DO UPDATE SET {}", sets.join(", "))
            }
        };

        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) {}",
            self.qualified(schema),
            names.join(", "),
            tuples.join(", "),
            self.natural_key.join(", "),
            conflict
        )
    }
}

fn placeholder(dialect: Dialect, index: usize, sql_type: SqlType) -> String {
    let param = match dialect {
        Dialect::DuckDb => "?".to_string(),
        Dialect::Postgres => format!("${index}::{}", sql_type.param_type().sql()),
    };
    format!("CAST({param} AS {})", sql_type.ddl())
}

/// Check that a name is safe to splice into SQL as an identifier
pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("identifier is empty".to_string()),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(c) => return Err(format!("'{name}' starts with '{c}'")),
    }
    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(format!("'{name}' contains '{c}'"));
    }
    if name.len() > 63 {
        return Err(format!("'{name}' is longer than 63 characters"));
    }
    Ok(())
}

pub const DIM_DATE: TableSpec = TableSpec {
    name: "dim_date",
    surrogate_key: Some("date_sk"),
    natural_key: &["full_date"],
    columns: &[
        col("full_date", SqlType::Date),
        col("year", SqlType::Int),
        col("quarter", SqlType::Int),
        col("month", SqlType::Int),
        col("day", SqlType::Int),
        col("weekday", SqlType::Varchar(15)),
    ],
    conflict: ConflictPolicy::DoNothing,
};

pub const DIM_CUSTOMER: TableSpec = TableSpec {
    name: "dim_customer",
    surrogate_key: Some("customer_sk"),
    natural_key: &["customer_id"],
    columns: &[
        col("customer_id", SqlType::Varchar(50)),
        col("customer_unique_id", SqlType::Varchar(50)),
        col("customer_zip_code_prefix", SqlType::Varchar(10)),
        col("customer_city", SqlType::Varchar(100)),
        col("customer_state", SqlType::Varchar(10)),
        col("customer_state_name", SqlType::Varchar(100)),
    ],
    conflict: ConflictPolicy::UpdateColumns(&[
        "customer_city",
        "customer_state",
        "customer_state_name",
    ]),
};

pub const DIM_SELLER: TableSpec = TableSpec {
    name: "dim_seller",
    surrogate_key: Some("seller_sk"),
    natural_key: &["seller_id"],
    columns: &[
        col("seller_id", SqlType::Varchar(50)),
        col("seller_zip_code_prefix", SqlType::Varchar(10)),
        col("seller_city", SqlType::Varchar(100)),
        col("seller_state", SqlType::Varchar(10)),
    ],
    conflict: ConflictPolicy::UpdateColumns(&["seller_city", "seller_state"]),
};

pub const DIM_PRODUCT: TableSpec = TableSpec {
    name: "dim_product",
    surrogate_key: Some("product_sk"),
    natural_key: &["product_id"],
    columns: &[
        col("product_id", SqlType::Varchar(50)),
        col("product_category_name", SqlType::Varchar(100)),
        col("product_name_length", SqlType::BigInt),
        col("product_description_length", SqlType::BigInt),
        col("product_photos_qty", SqlType::BigInt),
        col("product_weight_g", SqlType::Numeric),
        col("product_length_cm", SqlType::Numeric),
        col("product_height_cm", SqlType::Numeric),
        col("product_width_cm", SqlType::Numeric),
        col("size_anomaly", SqlType::Boolean),
        col("product_volume_cm3", SqlType::BigInt),
    ],
    conflict: ConflictPolicy::UpdateColumns(&[
        "product_category_name",
        "product_weight_g",
        "product_volume_cm3",
    ]),
};

pub const DIM_GEOLOCATION: TableSpec = TableSpec {
    name: "dim_geolocation",
    surrogate_key: Some("geolocation_sk"),
    natural_key: &[
        "geolocation_zip_code_prefix",
        "geolocation_city",
        "geolocation_state",
    ],
    columns: &[
        col("geolocation_zip_code_prefix", SqlType::Varchar(10)),
        col("geolocation_city", SqlType::Varchar(100)),
        col("geolocation_state", SqlType::Varchar(10)),
        col("latitude", SqlType::Double),
        col("longitude", SqlType::Double),
    ],
    conflict: ConflictPolicy::DoNothing,
};

pub const FACT_ORDERS: TableSpec = TableSpec {
    name: "fact_orders",
    surrogate_key: None,
    natural_key: &["order_id"],
    columns: &[
        col("order_id", SqlType::Varchar(50)),
        fk("customer_sk", "dim_customer", "customer_sk"),
        col("order_status", SqlType::Varchar(20)),
        fk("order_purchase_date", "dim_date", "date_sk"),
        fk("order_approved_date", "dim_date", "date_sk"),
        fk("order_delivered_carrier_date", "dim_date", "date_sk"),
        fk("order_delivered_customer_date", "dim_date", "date_sk"),
        fk("order_estimated_delivery_date", "dim_date", "date_sk"),
    ],
    conflict: ConflictPolicy::DoNothing,
};

pub const FACT_ORDER_ITEMS: TableSpec = TableSpec {
    name: "fact_order_items",
    surrogate_key: Some("order_item_sk"),
    natural_key: &["order_id", "order_item_id"],
    columns: &[
        Column {
            name: "order_id",
            sql_type: SqlType::Varchar(50),
            references: Some(("fact_orders", "order_id")),
        },
        col("order_item_id", SqlType::Int),
        fk("product_sk", "dim_product", "product_sk"),
        fk("seller_sk", "dim_seller", "seller_sk"),
        fk("shipping_limit_date_sk", "dim_date", "date_sk"),
        col("price", SqlType::Money),
        col("freight_value", SqlType::Money),
    ],
    conflict: ConflictPolicy::DoNothing,
};

pub const FACT_PAYMENTS: TableSpec = TableSpec {
    name: "fact_payments",
    surrogate_key: Some("payment_sk"),
    natural_key: &["order_id", "payment_sequential"],
    columns: &[
        Column {
            name: "order_id",
            sql_type: SqlType::Varchar(50),
            references: Some(("fact_orders", "order_id")),
        },
        col("payment_sequential", SqlType::Int),
        col("payment_type", SqlType::Varchar(20)),
        col("payment_installments", SqlType::Int),
        col("payment_value", SqlType::Money),
    ],
    conflict: ConflictPolicy::DoNothing,
};

pub const FACT_REVIEWS: TableSpec = TableSpec {
    name: "fact_reviews",
    surrogate_key: Some("review_sk"),
    natural_key: &["review_id"],
    columns: &[
        col("review_id", SqlType::Varchar(50)),
        Column {
            name: "order_id",
            sql_type: SqlType::Varchar(50),
            references: Some(("fact_orders", "order_id")),
        },
        col("review_score", SqlType::Int),
        col("review_comment_title", SqlType::Text),
        col("review_comment_message", SqlType::Text),
        fk("review_creation_date", "dim_date", "date_sk"),
    ],
    conflict: ConflictPolicy::DoNothing,
};

/// Every table, in creation order
pub const ALL_TABLES: [&TableSpec; 9] = [
    &DIM_DATE,
    &DIM_CUSTOMER,
    &DIM_SELLER,
    &DIM_PRODUCT,
    &DIM_GEOLOCATION,
    &FACT_ORDERS,
    &FACT_ORDER_ITEMS,
    &FACT_PAYMENTS,
    &FACT_REVIEWS,
];

/// Full provisioning script for a schema
pub fn create_all_sql(schema: &str, dialect: Dialect) -> String {
    let mut ddl = format!("CREATE SCHEMA IF NOT EXISTS {schema};\n");
    for spec in ALL_TABLES {
        ddl.push_str(&spec.create_sql(schema, dialect));
    }
    ddl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("olist_dw").is_ok());
        assert!(validate_identifier("_tmp1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("dw; DROP TABLE x").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_insert_sql_upsert_duckdb() {
        let sql = DIM_SELLER.insert_sql("olist_dw", Dialect::DuckDb, 2);
        assert!(sql.starts_with(
            "INSERT INTO olist_dw.dim_seller (seller_id, seller_zip_code_prefix, seller_city, seller_state) VALUES "
        ));
        assert_eq!(sql.matches("CAST(? AS").count(), 8);
        assert!(sql.ends_with(
            "ON CONFLICT (seller_id) DO UPDATE SET seller_city = EXCLUDED.seller_city, seller_state = EXCLUDED.seller_state"
        ));
    }

    #[test]
    fn test_insert_sql_postgres_placeholders() {
        let sql = FACT_PAYMENTS.insert_sql("dw", Dialect::Postgres, 2);
        assert!(sql.contains("CAST($1::TEXT AS VARCHAR(50))"));
        assert!(sql.contains("CAST($5::DOUBLE PRECISION AS NUMERIC(10,2))"));
        assert!(sql.contains("CAST($10::DOUBLE PRECISION AS NUMERIC(10,2))"));
        assert!(sql.ends_with("ON CONFLICT (order_id, payment_sequential) DO NOTHING"));
    }

    #[test]
    fn test_create_sql() {
        let duck = DIM_DATE.create_sql("dw", Dialect::DuckDb);
        assert!(duck.contains("CREATE SEQUENCE IF NOT EXISTS dw.dim_date_date_sk_seq"));
        assert!(duck.contains("date_sk BIGINT PRIMARY KEY DEFAULT nextval('dw.dim_date_date_sk_seq')"));
        assert!(duck.contains("UNIQUE (full_date)"));

        let pg = FACT_ORDERS.create_sql("dw", Dialect::Postgres);
        assert!(pg.contains("customer_sk BIGINT REFERENCES dw.dim_customer(customer_sk)"));
        assert!(pg.contains("PRIMARY KEY (order_id)"));
        assert!(!pg.contains("BIGSERIAL"));
    }

    #[test]
    fn test_rows_per_statement_respects_param_limit() {
        assert_eq!(DIM_DATE.rows_per_statement(1000), 1000);
        assert_eq!(DIM_DATE.rows_per_statement(0), 1);
        assert_eq!(DIM_DATE.rows_per_statement(1_000_000), MAX_PARAMS / 6);
    }

    #[test]
    fn test_key_indices() {
        assert_eq!(FACT_ORDER_ITEMS.key_indices(), vec![0, 1]);
        assert_eq!(DIM_GEOLOCATION.key_indices(), vec![0, 1, 2]);
    }
}
