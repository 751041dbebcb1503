//! REST API endpoints
//!
//! A single endpoint serves both the table list and the search results.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::layout::LayoutResolver;
use crate::schema::ErrorResponse;

pub mod search;

// Re-export handlers for convenience
pub use search::search_handler;

/// Shared, read-only state of the API handlers
pub struct BrowserState<DB: DatabaseProvider> {
    pub database: Arc<DB>,
    pub layouts: Arc<LayoutResolver>,
}

impl<DB: DatabaseProvider> BrowserState<DB> {
    pub fn new(database: Arc<DB>, layouts: LayoutResolver) -> Self {
        Self {
            database,
            layouts: Arc::new(layouts),
        }
    }
}

// Derived Clone would require DB: Clone
impl<DB: DatabaseProvider> Clone for BrowserState<DB> {
    fn clone(&self) -> Self {
        Self {
            database: Arc::clone(&self.database),
            layouts: Arc::clone(&self.layouts),
        }
    }
}

/// HTTP status of a database error
pub fn error_status(error: &DatabaseError) -> StatusCode {
    match error {
        DatabaseError::InvalidTable(_) => StatusCode::BAD_REQUEST,
        DatabaseError::TableNotFound(_) => StatusCode::NOT_FOUND,
        DatabaseError::Connection(_) | DatabaseError::Query(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `{"error": message}` with the status of the error
pub fn error_response(error: DatabaseError) -> Response {
    let status = error_status(&error);
    if status.is_server_error() {
        tracing::error!(%error, "request failed");
    } else {
        tracing::info!(%error, "request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}
