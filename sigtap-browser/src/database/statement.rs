//! SQL text shared by the providers
//!
//! Only identifiers that come from the catalog (table names validated against
//! the table list, column names returned by introspection) are written into
//! the statement text, always quoted. User input travels as bound parameters.

use crate::schema::ColumnInfo;

/// Identifier quoting function of a SQL dialect
pub type Quote = fn(&str) -> String;

/// Case-insensitive substring filter over a set of text columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    columns: Vec<String>,
    pattern: String,
}

impl TextFilter {
    /// Build a filter for `query` over the text columns of a table
    ///
    /// Returns `None` when the query is blank or the table has no text
    /// column; in both cases every row is eligible.
    pub fn new(query: &str, columns: &[ColumnInfo]) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let columns: Vec<String> = columns
            .iter()
            .filter(|column| column.is_text())
            .map(|column| column.name.clone())
            .collect();
        if columns.is_empty() {
            return None;
        }

        Some(Self {
            columns,
            pattern: format!("%{}%", query),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The wildcarded query, `%query%`
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Values to bind, one per filtered column, in placeholder order
    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|_| self.pattern.as_str())
    }
}

/// LIMIT/OFFSET of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u64,
    pub offset: u64,
}

impl PageWindow {
    /// Window of a 1-based page
    pub fn for_page(page: u64, per_page: u64) -> Self {
        Self {
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }
}

/// Quote an identifier with the dialect's quote character, doubling any
/// embedded quote character
pub fn quote_with(identifier: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(identifier.len() + 2);
    escaped.push(quote);
    for character in identifier.chars() {
        if character == quote {
            escaped.push(quote);
        }
        escaped.push(character);
    }
    escaped.push(quote);
    escaped
}

/// Build the WHERE clause of a filter, with a leading space
pub fn where_clause(filter: Option<&TextFilter>, quote: Quote) -> String {
    match filter {
        Some(filter) => {
            let conditions: Vec<String> = filter
                .columns()
                .iter()
                .map(|column| format!("LOWER({}) LIKE LOWER(?)", quote(column)))
                .collect();
            format!(" WHERE {}", conditions.join(" OR "))
        }
        None => String::new(),
    }
}

/// Build the ORDER BY clause, with a leading space
pub fn order_clause(order_by: &[String], quote: Quote) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let columns: Vec<String> = order_by.iter().map(|column| quote(column)).collect();
    format!(" ORDER BY {}", columns.join(", "))
}

/// `SELECT COUNT(*)` over the filtered rows
pub fn count_statement(table: &str, filter: Option<&TextFilter>, quote: Quote) -> String {
    format!(
        "SELECT COUNT(*) FROM {}{}",
        quote(table),
        where_clause(filter, quote)
    )
}

/// `SELECT *` over the filtered rows, ending in `LIMIT ? OFFSET ?`
pub fn select_statement(
    table: &str,
    filter: Option<&TextFilter>,
    order_by: &[String],
    quote: Quote,
) -> String {
    format!(
        "SELECT * FROM {}{}{} LIMIT ? OFFSET ?",
        quote(table),
        where_clause(filter, quote),
        order_clause(order_by, quote)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backtick(identifier: &str) -> String {
        quote_with(identifier, '`')
    }

    fn columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("co_procedimento", "char"),
            ColumnInfo::new("vl_sh", "decimal"),
            ColumnInfo::new("no_procedimento", "varchar"),
        ]
    }

    #[test]
    fn test_quote_with() {
        assert_eq!(quote_with("tb_grupo", '`'), "`tb_grupo`");
        assert_eq!(quote_with("odd`name", '`'), "`odd``name`");
        assert_eq!(quote_with("odd\"name", '"'), "\"odd\"\"name\"");
    }

    #[test]
    fn test_filter_covers_only_text_columns() {
        let filter = TextFilter::new("consulta", &columns()).unwrap();
        assert_eq!(filter.columns(), ["co_procedimento", "no_procedimento"]);
        assert_eq!(filter.pattern(), "%consulta%");
        assert_eq!(filter.bindings().count(), 2);
        assert!(filter.bindings().all(|value| value == "%consulta%"));
    }

    #[test]
    fn test_filter_skipped_for_blank_query() {
        assert!(TextFilter::new("", &columns()).is_none());
        assert!(TextFilter::new("   ", &columns()).is_none());
    }

    #[test]
    fn test_filter_skipped_without_text_columns() {
        let numeric = vec![
            ColumnInfo::new("id", "int"),
            ColumnInfo::new("vl_sa", "decimal"),
        ];
        assert!(TextFilter::new("abc", &numeric).is_none());
    }

    #[test]
    fn test_where_clause_or_combines_columns() {
        let filter = TextFilter::new("abc", &columns()).unwrap();
        let clause = where_clause(Some(&filter), backtick);
        assert_eq!(
            clause,
            " WHERE LOWER(`co_procedimento`) LIKE LOWER(?) OR LOWER(`no_procedimento`) LIKE LOWER(?)"
        );
        assert!(!clause.contains("abc"));
        assert!(where_clause(None, backtick).is_empty());
    }

    #[test]
    fn test_select_statement() {
        let order_by = vec!["co_procedimento".to_string()];
        let statement = select_statement("tb_procedimento", None, &order_by, backtick);
        assert_eq!(
            statement,
            "SELECT * FROM `tb_procedimento` ORDER BY `co_procedimento` LIMIT ? OFFSET ?"
        );

        let statement = count_statement("tb_procedimento", None, backtick);
        assert_eq!(statement, "SELECT COUNT(*) FROM `tb_procedimento`");
    }

    #[test]
    fn test_page_window() {
        assert_eq!(PageWindow::for_page(1, 20), PageWindow { limit: 20, offset: 0 });
        assert_eq!(PageWindow::for_page(3, 20), PageWindow { limit: 20, offset: 40 });
        assert_eq!(PageWindow::for_page(0, 20), PageWindow { limit: 20, offset: 0 });
    }
}
