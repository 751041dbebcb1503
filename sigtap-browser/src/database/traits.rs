//! Database provider trait
//!
//! This trait defines the interface that all database implementations must provide.

use crate::database::statement::{PageWindow, TextFilter};
use crate::schema::{ColumnInfo, Row};
use async_trait::async_trait;
use thiserror::Error;

/// Database provider trait for table discovery and data access
///
/// Implementations only run statements; table-name sanitization, catalog
/// validation and layout resolution happen in [`crate::search`] before any
/// of these methods is called with a table name.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// List all table names in the database, in engine order
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError>;

    /// Describe the columns of a table, in declaration order
    ///
    /// # Arguments
    ///
    /// * `table` - Name of an existing table
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError>;

    /// Count the rows matching an optional text filter
    ///
    /// # Arguments
    ///
    /// * `table` - Name of an existing table
    /// * `filter` - Substring filter over the text columns, if any
    async fn count_rows(
        &self,
        table: &str,
        filter: Option<&TextFilter>,
    ) -> Result<u64, DatabaseError>;

    /// Fetch one window of rows matching an optional text filter
    ///
    /// # Arguments
    ///
    /// * `table` - Name of an existing table
    /// * `filter` - Substring filter over the text columns, if any
    /// * `order_by` - Columns giving the rows a deterministic order
    /// * `window` - LIMIT/OFFSET of the page
    async fn fetch_rows(
        &self,
        table: &str,
        filter: Option<&TextFilter>,
        order_by: &[String],
        window: PageWindow,
    ) -> Result<Vec<Row>, DatabaseError>;
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be reached
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A statement failed
    #[error("Database error: {0}")]
    Query(String),

    /// Table not found in the catalog
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Table parameter is empty once sanitized
    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => DatabaseError::Connection(error.to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}
