//! Frontend asset serving
//!
//! This module serves the static page and script embedded in the binary,
//! with proper MIME types and base path injection.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use include_dir::{include_dir, Dir};
use std::sync::Arc;

// Embed the frontend directory at compile time
static FRONTEND_FILES: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend");

/// State for frontend serving (stores base path for relative URLs)
#[derive(Clone)]
pub struct FrontendState {
    pub base_path: Arc<String>,
}

impl FrontendState {
    /// Create a new frontend state with the given base path
    pub fn new(base_path: String) -> Self {
        Self {
            base_path: Arc::new(base_path),
        }
    }
}

/// Create a router for serving frontend assets
///
/// This returns a Router that serves:
/// - GET / -> index.html with injected <base href> tag
/// - GET /assets/* -> static assets
///
/// # Arguments
///
/// * `base_path` - The base URL path where the frontend is mounted (e.g., "/sigtap")
pub fn create_frontend_router(base_path: String) -> Router {
    let state = FrontendState::new(base_path);

    Router::new()
        .route("/", get(serve_index_page))
        .route("/assets/{*path}", get(serve_static_asset))
        .with_state(state)
}

/// Serve index.html with a <base href> tag so that the script's relative
/// `api/search` URL resolves under the mount point
async fn serve_index_page(State(state): State<FrontendState>) -> Response {
    let Some(file) = FRONTEND_FILES.get_file("index.html") else {
        return not_found("index.html");
    };

    let mut contents = String::from_utf8_lossy(file.contents()).into_owned();
    if let Some(head_position) = contents.find("<head>") {
        let insert_position = head_position + "<head>".len();
        let base_tag = format!("\n    <base href=\"{}/\">", state.base_path);
        contents.insert_str(insert_position, &base_tag);
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        contents,
    )
        .into_response()
}

/// Serve static assets with proper MIME types
async fn serve_static_asset(Path(path): Path<String>) -> Response {
    let asset_path = format!("assets/{}", path);

    let Some(file) = FRONTEND_FILES.get_file(&asset_path) else {
        return not_found(&asset_path);
    };

    let mime_type = mime_guess::from_path(&asset_path)
        .first_or_octet_stream()
        .to_string();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        file.contents(),
    )
        .into_response()
}

fn not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("Asset not found: {}", path),
    )
        .into_response()
}
