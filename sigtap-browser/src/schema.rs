//! Request and response types
//!
//! These types describe the table metadata discovered at runtime and the JSON
//! shapes exchanged with the frontend.

use serde::{Deserialize, Serialize};

/// A single result row: native column name -> value rendered as text (or `null`)
///
/// Keys keep the database column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Information about a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// Declared SQL type (e.g., "varchar", "TEXT", "decimal")
    pub data_type: String,

    /// Position of the column in the primary key, starting at 1
    pub primary_key_position: Option<u32>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key_position: None,
        }
    }

    /// Whether the column takes part in substring filtering
    ///
    /// A column is text when its declared type contains `char` or `text`.
    pub fn is_text(&self) -> bool {
        let data_type = self.data_type.to_ascii_lowercase();
        data_type.contains("char") || data_type.contains("text")
    }
}

/// Query string of `GET /api/search`
///
/// Every field is kept raw; sanitization and page parsing live in
/// [`crate::search`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Table to search; absent or empty lists the tables instead
    pub table: Option<String>,

    /// Free-text filter
    pub query: Option<String>,

    /// Requested page, 1-based
    pub page: Option<String>,
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesResponse {
    /// Table names, in the order the database returned them
    pub tables: Vec<String>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Columns to display, after layout resolution
    pub columns: Vec<String>,

    /// The rows of this page
    pub rows: Vec<Row>,

    /// Number of rows matching the filter
    pub total: u64,

    /// Echoed page number
    pub page: u64,

    /// Fixed page size
    pub per_page: u64,
}

/// Error body shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
