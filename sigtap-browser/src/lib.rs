//! # sigtap-browser
//!
//! A minimal web tool for browsing the SIGTAP procedure-code database.
//!
//! ## Features
//!
//! - Lists the tables of the configured database
//! - Case-insensitive substring search over every text column of a table
//! - Fixed-size pagination with a deterministic row order
//! - Optional `<table>_layout.txt` / `<table>_layout.csv` sidecar files that
//!   choose which columns are displayed, and in which order
//! - A static HTML/JavaScript frontend embedded in the binary
//! - Support for MySQL (the SIGTAP loader target) and SQLite
//!
//! ## Security Warning
//!
//! There is no authentication. The tool exposes every table of the configured
//! database to anyone who can reach it.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::Router;
//! use sigtap_browser::SigtapBrowser;
//! use sqlx::SqlitePool;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = SqlitePool::connect("sqlite::memory:")
//!         .await
//!         .unwrap();
//!
//!     let app: Router = SigtapBrowser::sqlite("/sigtap", pool)
//!         .with_layout_dir("./layouts")
//!         .into_router();
//!
//!     // Serve the application...
//! }
//! ```

pub mod api;
pub mod database;
pub mod delimited;
pub mod frontend;
pub mod layer;
pub mod layout;
pub mod schema;
pub mod search;
pub mod settings;

pub use layer::SigtapBrowser;
pub use layout::LayoutResolver;
pub use schema::{ColumnInfo, Row, SearchResponse, TablesResponse};
pub use settings::{DatabaseSettings, Settings};

pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "mysql")]
pub use database::mysql::MySqlProvider;

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;
