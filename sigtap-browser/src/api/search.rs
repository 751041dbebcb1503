//! Table listing and search endpoint

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::api::{error_response, BrowserState};
use crate::database::traits::DatabaseProvider;
use crate::schema::SearchParams;
use crate::search;

/// Handler for GET /api/search
///
/// Query parameters:
/// - table: Table to search (characters outside `[A-Za-z0-9_]` are dropped)
/// - query: Free text, matched case-insensitively inside every text column
/// - page: 1-based page number (default: 1)
///
/// Without `table`, returns the table list:
/// ```json
/// { "tables": ["tb_grupo", "tb_procedimento"] }
/// ```
///
/// With `table`, returns one page of rows:
/// ```json
/// {
///   "columns": ["co_grupo", "no_grupo"],
///   "rows": [{ "co_grupo": "01", "no_grupo": "Ações de promoção e prevenção em saúde" }],
///   "total": 8,
///   "page": 1,
///   "perPage": 20
/// }
/// ```
///
/// Errors come back as `{ "error": "..." }` with status 400 (table name empty
/// once sanitized), 404 (unknown table) or 500 (connection or statement
/// failure).
pub async fn search_handler<DB: DatabaseProvider>(
    State(state): State<BrowserState<DB>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let table = params
        .table
        .as_deref()
        .map(str::trim)
        .filter(|table| !table.is_empty());

    let Some(table) = table else {
        return match search::list_tables(state.database.as_ref()).await {
            Ok(tables) => (StatusCode::OK, Json(tables)).into_response(),
            Err(error) => error_response(error),
        };
    };

    let page = search::parse_page(params.page.as_deref());
    let query = params.query.as_deref().unwrap_or_default();

    match search::search(
        state.database.as_ref(),
        &state.layouts,
        table,
        query,
        page,
    )
    .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}
