//! SQLite database provider implementation

use crate::database::statement::{self, PageWindow, TextFilter};
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{ColumnInfo, Row};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteColumn, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// SQLite uses double quotes for identifiers
    fn quote_identifier(identifier: &str) -> String {
        statement::quote_with(identifier, '"')
    }

    /// Convert a SQLite row to a JSON object keyed by column name
    fn row_to_json(row: &SqliteRow) -> Result<Row, DatabaseError> {
        let mut map = Row::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }

    /// Render a column value as text, or `null`
    fn extract_column_value(row: &SqliteRow, column: &SqliteColumn) -> Result<Value, DatabaseError> {
        let index = column.ordinal();

        if row.try_get_raw(index)?.is_null() {
            return Ok(Value::Null);
        }

        // SQLite has dynamic typing; the reported type is the value's storage class
        match column.type_info().name() {
            "INTEGER" => {
                if let Ok(value) = row.try_get::<i64, _>(index) {
                    return Ok(Value::String(value.to_string()));
                }
            }
            "REAL" => {
                if let Ok(value) = row.try_get::<f64, _>(index) {
                    return Ok(Value::String(value.to_string()));
                }
            }
            "BLOB" => {
                if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
                    return Ok(Value::String(String::from_utf8_lossy(&value).into_owned()));
                }
            }
            _ => {}
        }

        if let Ok(value) = row.try_get::<String, _>(index) {
            return Ok(Value::String(value));
        }
        if let Ok(value) = row.try_get::<i64, _>(index) {
            return Ok(Value::String(value.to_string()));
        }
        if let Ok(value) = row.try_get::<f64, _>(index) {
            return Ok(Value::String(value.to_string()));
        }

        Ok(Value::Null)
    }
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let table_info_query = format!("PRAGMA table_info({})", Self::quote_identifier(table));
        let column_rows = sqlx::query(&table_info_query)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in column_rows {
            // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let primary_key: i64 = row.try_get("pk")?;

            columns.push(ColumnInfo {
                name,
                data_type,
                primary_key_position: u32::try_from(primary_key).ok().filter(|position| *position > 0),
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
        // SQLite reads a negative OFFSET as zero
        sql_query = sql_query
            .bind(i64::try_from(window.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(window.offset).unwrap_or(i64::MAX));

        let rows = sql_query.fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_json).collect()
    }
}
