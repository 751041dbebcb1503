//! MySQL database provider implementation

use crate::database::statement::{self, PageWindow, TextFilter};
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{ColumnInfo, Row};
use crate::settings::DatabaseSettings;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlColumn, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::time::Duration;

/// How long a request waits for a connection before reporting a connection failure
const ACQUIRE_TIMEOUT_SECONDS: u64 = 5;

/// MySQL database provider
pub struct MySqlProvider {
    pool: MySqlPool,
}

impl MySqlProvider {
    /// Create a new MySQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - MySQL connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create a provider whose connections are opened on first use
    ///
    /// The server starts even when the database is down; each request then
    /// reports the connection failure on its own.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Self {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECONDS))
            .connect_lazy_with(settings.mysql_options());
        Self::new(pool)
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// MySQL uses backticks for identifiers
    fn quote_identifier(identifier: &str) -> String {
        statement::quote_with(identifier, '`')
    }

    /// Convert a MySQL row to a JSON object keyed by column name
    fn row_to_json(row: &MySqlRow) -> Result<Row, DatabaseError> {
        let mut map = Row::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }

    /// Render a column value as text, or `null`
    fn extract_column_value(row: &MySqlRow, column: &MySqlColumn) -> Result<Value, DatabaseError> {
        let index = column.ordinal();

        if row.try_get_raw(index)?.is_null() {
            return Ok(Value::Null);
        }

        let text = match column.type_info().name() {
            "BOOLEAN" => row
                .try_get::<bool, _>(index)
                .ok()
                .map(|value| if value { "1" } else { "0" }.to_string()),
            name if name.ends_with("UNSIGNED") => {
                row.try_get::<u64, _>(index).ok().map(|value| value.to_string())
            }
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                row.try_get::<i64, _>(index).ok().map(|value| value.to_string())
            }
            "FLOAT" => row.try_get::<f32, _>(index).ok().map(|value| value.to_string()),
            "DOUBLE" => row.try_get::<f64, _>(index).ok().map(|value| value.to_string()),
            // DECIMAL travels as its textual representation in the binary protocol
            "DECIMAL" => row.try_get_unchecked::<String, _>(index).ok(),
            "DATE" => row
                .try_get::<NaiveDate, _>(index)
                .ok()
                .map(|value| value.to_string()),
            "DATETIME" | "TIMESTAMP" => row
                .try_get::<NaiveDateTime, _>(index)
                .ok()
                .map(|value| value.format("%Y-%m-%d %H:%M:%S").to_string()),
            "TIME" => row
                .try_get::<NaiveTime, _>(index)
                .ok()
                .map(|value| value.to_string()),
            _ => row.try_get::<String, _>(index).ok(),
        };
        if let Some(text) = text {
            return Ok(Value::String(text));
        }

        // Fallback: try common types in order
        if let Ok(value) = row.try_get::<String, _>(index) {
            return Ok(Value::String(value));
        }
        if let Ok(value) = row.try_get::<i64, _>(index) {
            return Ok(Value::String(value.to_string()));
        }
        if let Ok(value) = row.try_get::<u64, _>(index) {
            return Ok(Value::String(value.to_string()));
        }
        if let Ok(value) = row.try_get::<f64, _>(index) {
            return Ok(Value::String(value.to_string()));
        }
        if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
            return Ok(Value::String(String::from_utf8_lossy(&value).into_owned()));
        }

        Ok(Value::Null)
    }
}

#[async_trait]
impl DatabaseProvider for MySqlProvider {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        // information_schema reports binary strings on some servers, hence the casts
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT CAST(TABLE_NAME AS CHAR) FROM information_schema.TABLES WHERE TABLE_SCHEMA = DATABASE()",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let column_rows = sqlx::query(
            r#"
            SELECT
                CAST(c.COLUMN_NAME AS CHAR) AS column_name,
                CAST(c.DATA_TYPE AS CHAR) AS data_type,
                CAST(k.ORDINAL_POSITION AS SIGNED) AS key_position
            FROM information_schema.COLUMNS c
            LEFT JOIN information_schema.KEY_COLUMN_USAGE k
                ON k.TABLE_SCHEMA = c.TABLE_SCHEMA
                AND k.TABLE_NAME = c.TABLE_NAME
                AND k.COLUMN_NAME = c.COLUMN_NAME
                AND k.CONSTRAINT_NAME = 'PRIMARY'
            WHERE c.TABLE_SCHEMA = DATABASE() AND c.TABLE_NAME = ?
            ORDER BY c.ORDINAL_POSITION
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in column_rows {
            let name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            let key_position: Option<i64> = row.try_get("key_position")?;

            columns.push(ColumnInfo {
                name,
                data_type,
                primary_key_position: key_position.and_then(|position| u32::try_from(position).ok()),
            });
        }

        Ok(columns)
    }

    async fn count_rows(
        &self,
        table: &str,
        filter: Option<&TextFilter>,
    ) -> Result<u64, DatabaseError> {
        let count_query = statement::count_statement(table, filter, Self::quote_identifier);
        tracing::debug!(sql = %count_query, "counting rows");

        let mut sql_query = sqlx::query_scalar::<_, i64>(&count_query);
        for value in filter.into_iter().flat_map(|filter| filter.bindings()) {
            sql_query = sql_query.bind(value);
        }

        let count = sql_query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_rows(
        &self,
        table: &str,
        filter: Option<&TextFilter>,
        order_by: &[String],
        window: PageWindow,
    ) -> Result<Vec<Row>, DatabaseError> {
        let select_query =
            statement::select_statement(table, filter, order_by, Self::quote_identifier);
        tracing::debug!(sql = %select_query, "fetching rows");

        let mut sql_query = sqlx::query(&select_query);
        for value in filter.into_iter().flat_map(|filter| filter.bindings()) {
            sql_query = sql_query.bind(value);
        }
        sql_query = sql_query.bind(window.limit).bind(window.offset);

        let rows = sql_query.fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_json).collect()
    }
}
