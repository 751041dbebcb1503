//! SigtapBrowser - Axum integration
//!
//! This module provides the entry point that turns a database provider into
//! an Axum router serving the API and the frontend.

use crate::api::{search_handler, BrowserState};
use crate::database::traits::DatabaseProvider;
use crate::frontend::create_frontend_router;
use crate::layout::LayoutResolver;
use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[cfg(feature = "mysql")]
use crate::database::mysql::MySqlProvider;

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

/// Builder for the SIGTAP browser router
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use sigtap_browser::SigtapBrowser;
/// use sqlx::SqlitePool;
///
/// # async fn example() {
/// let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let app: Router = SigtapBrowser::sqlite("", pool).into_router();
/// # }
/// ```
pub struct SigtapBrowser<DB: DatabaseProvider> {
    base_path: String,
    database: Arc<DB>,
    layout_dir: PathBuf,
}

impl<DB: DatabaseProvider> SigtapBrowser<DB> {
    /// Create a new browser mounted at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - URL path of the browser (e.g., "/sigtap"); empty mounts it at the root
    /// * `database` - The database provider implementation
    pub fn new(base_path: impl Into<String>, database: DB) -> Self {
        Self {
            base_path: normalize_base_path(&base_path.into()),
            database: Arc::new(database),
            layout_dir: PathBuf::from("."),
        }
    }

    /// Directory searched for `<table>_layout.txt` / `<table>_layout.csv` files
    ///
    /// Defaults to the working directory.
    pub fn with_layout_dir(mut self, layout_dir: impl Into<PathBuf>) -> Self {
        self.layout_dir = layout_dir.into();
        self
    }

    /// Convert into an Axum Router that can be served or merged
    ///
    /// The returned router includes:
    /// - Frontend serving at `{base_path}/`
    /// - The search endpoint at `{base_path}/api/search`
    /// - Permissive CORS and request tracing
    pub fn into_router(self) -> Router {
        let state = BrowserState::new(self.database, LayoutResolver::new(self.layout_dir));

        let api_router = Router::new()
            .route("/search", get(search_handler::<DB>))
            .with_state(state);

        let frontend_router = create_frontend_router(self.base_path.clone());

        let router = if self.base_path.is_empty() {
            Router::new()
                .nest("/api", api_router)
                .merge(frontend_router)
        } else {
            Router::new()
                .nest(&format!("{}/api", self.base_path), api_router)
                .nest(&self.base_path, frontend_router)
        };

        router
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }
}

/// `/sigtap/` and `sigtap` become `/sigtap`; `/` and `` become ``
fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(feature = "mysql")]
impl SigtapBrowser<MySqlProvider> {
    /// Create a new browser for MySQL
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the browser will be mounted
    /// * `pool` - The MySQL connection pool
    pub fn mysql(base_path: impl Into<String>, pool: sqlx::MySqlPool) -> Self {
        Self::new(base_path, MySqlProvider::new(pool))
    }
}

#[cfg(feature = "sqlite")]
impl SigtapBrowser<SqliteProvider> {
    /// Create a new browser for SQLite
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the browser will be mounted
    /// * `pool` - The SQLite connection pool
    pub fn sqlite(base_path: impl Into<String>, pool: sqlx::SqlitePool) -> Self {
        Self::new(base_path, SqliteProvider::new(pool))
    }
}
