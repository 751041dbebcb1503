//! Table search: sanitization, catalog validation, layout resolution and
//! the count/select pair behind one page of results

use crate::database::statement::{PageWindow, TextFilter};
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::layout::{self, LayoutResolver};
use crate::schema::{ColumnInfo, SearchResponse, TablesResponse};
use std::num::IntErrorKind;

/// Fixed page size
pub const PER_PAGE: u64 = 20;

/// Highest page served, 2^53, the largest integer a JavaScript number holds
/// exactly
pub const MAX_PAGE: u64 = 1 << 53;

/// Keep only `[A-Za-z0-9_]`; every other character is dropped
///
/// `tb_x; DROP TABLE` becomes `tb_xDROPTABLE`.
pub fn sanitize_table_name(raw: &str) -> String {
    raw.chars()
        .filter(|character| character.is_ascii_alphanumeric() || *character == '_')
        .collect()
}

/// Parse the requested page; missing, non-numeric and zero pages are page 1
///
/// Pages above [`MAX_PAGE`], overflowing ones included, become [`MAX_PAGE`].
pub fn parse_page(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return 1;
    };
    match raw.trim().parse::<u64>() {
        Ok(page) if page >= 1 => page.min(MAX_PAGE),
        Err(error) if *error.kind() == IntErrorKind::PosOverflow => MAX_PAGE,
        _ => 1,
    }
}

/// Columns giving a table a deterministic row order
///
/// The primary key in key order, else the first column.
pub fn order_columns(columns: &[ColumnInfo]) -> Vec<String> {
    let mut primary_key: Vec<(u32, &str)> = columns
        .iter()
        .filter_map(|column| {
            column
                .primary_key_position
                .map(|position| (position, column.name.as_str()))
        })
        .collect();
    primary_key.sort_by_key(|(position, _)| *position);

    if primary_key.is_empty() {
        columns.first().map(|column| column.name.clone()).into_iter().collect()
    } else {
        primary_key.into_iter().map(|(_, name)| name.to_string()).collect()
    }
}

/// List the tables of the database
pub async fn list_tables<DB: DatabaseProvider + ?Sized>(
    database: &DB,
) -> Result<TablesResponse, DatabaseError> {
    let tables = database.list_tables().await?;
    Ok(TablesResponse { tables })
}

/// Search one page of a table
///
/// # Arguments
///
/// * `database` - Database provider
/// * `layouts` - Layout files lookup
/// * `table` - Raw table parameter, sanitized here
/// * `query` - Free text matched as a case-insensitive substring of every text column
/// * `page` - 1-based page number
///
/// # Errors
///
/// [`DatabaseError::InvalidTable`] when the name sanitizes to nothing,
/// [`DatabaseError::TableNotFound`] when it is not in the catalog, and any
/// connection or statement failure.
pub async fn search<DB: DatabaseProvider + ?Sized>(
    database: &DB,
    layouts: &LayoutResolver,
    table: &str,
    query: &str,
    page: u64,
) -> Result<SearchResponse, DatabaseError> {
    let page = page.clamp(1, MAX_PAGE);
    let table_name = sanitize_table_name(table);
    if table_name.is_empty() {
        return Err(DatabaseError::InvalidTable(table.to_string()));
    }

    let tables = database.list_tables().await?;
    if !tables.iter().any(|known| *known == table_name) {
        return Err(DatabaseError::TableNotFound(table_name));
    }

    let columns = database.describe_table(&table_name).await?;
    let column_names: Vec<String> = columns.iter().map(|column| column.name.clone()).collect();
    let layout_columns = layouts.display_columns(&table_name).await;
    let display_columns = layout::resolve_columns(&layout_columns, &column_names);

    let filter = TextFilter::new(query, &columns);
    let order_by = order_columns(&columns);

    let total = database.count_rows(&table_name, filter.as_ref()).await?;
    let rows = database
        .fetch_rows(
            &table_name,
            filter.as_ref(),
            &order_by,
            PageWindow::for_page(page, PER_PAGE),
        )
        .await?;

    tracing::debug!(
        table = %table_name,
        filtered = filter.is_some(),
        total,
        page,
        returned = rows.len(),
        "search completed"
    );

    Ok(SearchResponse {
        columns: display_columns,
        rows,
        total,
        page,
        per_page: PER_PAGE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("tb_x; DROP TABLE"), "tb_xDROPTABLE");
        assert_eq!(sanitize_table_name("tb_procedimento"), "tb_procedimento");
        assert_eq!(sanitize_table_name("`tb`.\"x\""), "tbx");
        assert_eq!(sanitize_table_name("tb_ção"), "tb_o");
        assert_eq!(sanitize_table_name("';--"), "");
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-4")), 1);
        assert_eq!(parse_page(Some("2")), 2);
        assert_eq!(parse_page(Some(" 7 ")), 7);
        assert_eq!(parse_page(Some("9007199254740993")), MAX_PAGE);
        assert_eq!(parse_page(Some("18446744073709551616")), MAX_PAGE);
        assert_eq!(parse_page(Some("99999999999999999999999")), MAX_PAGE);
    }

    #[test]
    fn test_order_columns_uses_primary_key_order() {
        let columns = vec![
            ColumnInfo {
                primary_key_position: Some(2),
                ..ColumnInfo::new("co_registro", "char")
            },
            ColumnInfo::new("no_registro", "varchar"),
            ColumnInfo {
                primary_key_position: Some(1),
                ..ColumnInfo::new("co_procedimento", "char")
            },
        ];
        assert_eq!(order_columns(&columns), ["co_procedimento", "co_registro"]);
    }

    #[test]
    fn test_order_columns_falls_back_to_first_column() {
        let columns = vec![
            ColumnInfo::new("co_grupo", "char"),
            ColumnInfo::new("no_grupo", "varchar"),
        ];
        assert_eq!(order_columns(&columns), ["co_grupo"]);
        assert!(order_columns(&[]).is_empty());
    }
}
