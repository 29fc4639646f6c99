//! Connection pool wrapper: `select` returns rows as JSON objects, `execute` returns the
//! affected-row count. The pool is built once at startup and passed explicitly.

use crate::config::DatabaseConfig;
use crate::sql::MySqlBindValue;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use std::sync::Arc;

/// One result row, column name to value.
pub type Row = Map<String, Value>;

/// Statement execution seam between the ORM and the driver.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a query with `?` placeholders; at most `size` rows when given.
    async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> Result<Vec<Row>, sqlx::Error>;

    /// Run an insert/update/delete; returns the affected-row count.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, sqlx::Error>;
}

/// Shared handle to whichever executor the process was started with.
pub type DbPool = Arc<dyn SqlExecutor>;

pub async fn create_pool(config: &DatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        min = config.min_connections,
        max = config.max_connections,
        "create database connection pool"
    );
    MySqlPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .connect(&config.connection_url())
        .await
}

#[derive(Clone)]
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlExecutor { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn into_shared(self) -> DbPool {
        Arc::new(self)
    }
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> Result<Vec<Row>, sqlx::Error> {
        tracing::info!(sql = %sql, args = ?args, "SQL");
        let mut query = sqlx::query(sql);
        for a in args {
            query = query.bind(MySqlBindValue::from_json(a));
        }
        let rows = match size {
            Some(1) => query.fetch_optional(&self.pool).await?.into_iter().collect(),
            Some(n) => {
                let mut rows = query.fetch_all(&self.pool).await?;
                rows.truncate(n);
                rows
            }
            None => query.fetch_all(&self.pool).await?,
        };
        tracing::info!(rows = rows.len(), "rows returned");
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, sqlx::Error> {
        tracing::info!(sql = %sql, "SQL");
        let mut query = sqlx::query(sql);
        for a in args {
            query = query.bind(MySqlBindValue::from_json(a));
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn row_to_json(row: &MySqlRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

/// Integers are tried before `bool`: MySQL has no boolean wire type and sqlx would
/// otherwise read counts as booleans. Entities coerce 0/1 back for boolean fields.
fn cell_to_value(row: &MySqlRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(name) {
        return Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }
    Value::Null
}
