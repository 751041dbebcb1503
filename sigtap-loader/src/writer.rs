//! Table writers: MySQL, and the interface the loader drives

use crate::ddl::{self, ColumnDefinition};
use crate::table::TableData;
use async_trait::async_trait;
use sigtap_browser::DatabaseSettings;
use sqlx::mysql::{MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::{Connection, MySql, QueryBuilder};
use tracing::debug;

/// MySQL accepts at most this many placeholders in one statement
const MAX_PLACEHOLDERS: usize = 65_535;

/// Destination of loaded tables
#[async_trait]
pub trait TableWriter: Send + Sync {
    /// Create `table` if missing, dropping it first when `recreate` is set
    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        recreate: bool,
    ) -> Result<(), sqlx::Error>;

    /// Append every row of `data`, returning the number of rows written
    async fn insert_rows(&self, table: &str, data: &TableData) -> Result<u64, sqlx::Error>;
}

/// Rows per `INSERT` for a given column count
pub fn rows_per_statement(chunk_size: usize, columns: usize) -> usize {
    chunk_size.min(MAX_PLACEHOLDERS / columns.max(1)).max(1)
}

/// Create the configured database if it does not exist yet
pub async fn ensure_database(settings: &DatabaseSettings) -> Result<(), sqlx::Error> {
    let mut connection = MySqlConnection::connect_with(&settings.mysql_server_options()).await?;
    sqlx::query(&ddl::create_database_statement(&settings.database))
        .execute(&mut connection)
        .await?;
    connection.close().await
}

/// Writes into a MySQL database
pub struct MySqlWriter {
    pool: MySqlPool,
    chunk_size: usize,
}

impl MySqlWriter {
    pub async fn connect(settings: &DatabaseSettings, chunk_size: usize) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(settings.mysql_options())
            .await?;
        Ok(Self { pool, chunk_size })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TableWriter for MySqlWriter {
    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        recreate: bool,
    ) -> Result<(), sqlx::Error> {
        if recreate {
            sqlx::query(&ddl::drop_table_statement(table))
                .execute(&self.pool)
                .await?;
        }
        let statement = ddl::create_table_statement(table, columns);
        debug!(sql = %statement, "creating table");
        sqlx::query(&statement).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_rows(&self, table: &str, data: &TableData) -> Result<u64, sqlx::Error> {
        if data.columns.is_empty() || data.rows.is_empty() {
            return Ok(0);
        }

        let columns: Vec<String> = data
            .columns
            .iter()
            .map(|column| ddl::quote_identifier(column))
            .collect();
        let prefix = format!(
            "INSERT INTO {} ({}) ",
            ddl::quote_identifier(table),
            columns.join(", ")
        );

        let mut written = 0;
        for chunk in data.rows.chunks(rows_per_statement(self.chunk_size, columns.len())) {
            let mut builder = QueryBuilder::<MySql>::new(&prefix);
            builder.push_values(chunk, |mut values, row| {
                for cell in row {
                    values.push_bind(cell.clone());
                }
            });
            written += builder.build().execute(&self.pool).await?.rows_affected();
            debug!(table = %table, written, "chunk inserted");
        }

        Ok(written)
    }
}
