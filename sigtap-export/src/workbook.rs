//! One worksheet per table

use anyhow::{bail, Context};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::Value;
use sigtap_browser::database::statement::PageWindow;
use sigtap_browser::search::order_columns;
use sigtap_browser::DatabaseProvider;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Excel limit on worksheet names
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Excel limit on rows per worksheet, header included
const MAX_SHEET_ROWS: u32 = 1_048_576;

/// Characters Excel refuses in worksheet names
const INVALID_SHEET_CHARS: [char; 8] = ['[', ']', ':', '*', '?', '/', '\\', '\''];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub tables: usize,
    pub rows: u64,
}

/// Worksheet name for a table: invalid characters become `_`, the name is
/// cut at 31 characters and made unique, ignoring case, among `taken`
pub fn sheet_name(table: &str, taken: &mut HashSet<String>) -> String {
    let cleaned: String = table
        .chars()
        .map(|character| {
            if INVALID_SHEET_CHARS.contains(&character) {
                '_'
            } else {
                character
            }
        })
        .collect();
    let base: String = match cleaned.trim() {
        "" => "sheet".to_string(),
        name => name.chars().take(MAX_SHEET_NAME_CHARS).collect(),
    };

    let mut name = base.clone();
    let mut suffix = 1;
    while taken.contains(&name.to_lowercase()) {
        let marker = format!("~{suffix}");
        let kept = MAX_SHEET_NAME_CHARS.saturating_sub(marker.chars().count());
        name = base.chars().take(kept).chain(marker.chars()).collect();
        suffix += 1;
    }

    taken.insert(name.to_lowercase());
    name
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Write every table of `database` to the workbook at `path`
///
/// Each sheet starts with a bold header row of column names followed by the
/// rows in primary-key order, fetched `batch_size` at a time. Rows past the
/// Excel sheet limit are left out with a warning.
pub async fn export_workbook<DB: DatabaseProvider + ?Sized>(
    database: &DB,
    path: &Path,
    batch_size: u64,
) -> anyhow::Result<ExportSummary> {
    let tables = database.list_tables().await.context("listing tables")?;
    if tables.is_empty() {
        bail!("no tables found in the database");
    }

    let header_format = Format::new().set_bold();
    let mut workbook = Workbook::new();
    let mut taken = HashSet::new();
    let mut summary = ExportSummary::default();

    for table in &tables {
        let name = sheet_name(table, &mut taken);
        info!(table = %table, sheet = %name, "exporting");

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;
        let rows = write_table(database, table, worksheet, &header_format, batch_size.max(1))
            .await
            .with_context(|| format!("exporting {table}"))?;

        summary.tables += 1;
        summary.rows += rows;
    }

    workbook
        .save(path)
        .with_context(|| format!("saving {}", path.display()))?;
    info!(path = %path.display(), tables = summary.tables, rows = summary.rows, "export finished");
    Ok(summary)
}

async fn write_table<DB: DatabaseProvider + ?Sized>(
    database: &DB,
    table: &str,
    worksheet: &mut Worksheet,
    header_format: &Format,
    batch_size: u64,
) -> anyhow::Result<u64> {
    let columns = database.describe_table(table).await?;
    let order_by = order_columns(&columns);

    for (index, column) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, u16::try_from(index)?, &column.name, header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    let mut sheet_row: u32 = 1;
    let mut offset = 0;
    loop {
        let window = PageWindow {
            limit: batch_size,
            offset,
        };
        let rows = database.fetch_rows(table, None, &order_by, window).await?;

        for row in &rows {
            if sheet_row == MAX_SHEET_ROWS {
                warn!(table = %table, "sheet row limit reached, remaining rows left out");
                return Ok(u64::from(sheet_row - 1));
            }
            for (index, column) in columns.iter().enumerate() {
                if let Some(text) = row.get(&column.name).and_then(cell_text) {
                    worksheet.write_string(sheet_row, u16::try_from(index)?, text)?;
                }
            }
            sheet_row += 1;
        }

        if (rows.len() as u64) < batch_size {
            break;
        }
        offset += batch_size;
    }

    Ok(u64::from(sheet_row - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigtap_browser::SqliteProvider;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::io::Read;

    async fn provider() -> SqliteProvider {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query("CREATE TABLE tb_procedimento (co_procedimento VARCHAR(10) PRIMARY KEY, no_procedimento VARCHAR(250))")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE rl_procedimento_compativel_com_cid_202401 (co_cid TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        for index in (1..=25).rev() {
            sqlx::query("INSERT INTO tb_procedimento VALUES (?, ?)")
                .bind(format!("{index:010}"))
                .bind(if index == 7 { None } else { Some(format!("Consulta {index}")) })
                .execute(&pool)
                .await
                .unwrap();
        }

        SqliteProvider::new(pool)
    }

    fn archive_entry(path: &Path, entry: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut content = String::new();
        archive.by_name(entry).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_sheet_name_limits() {
        let mut taken = HashSet::new();
        assert_eq!(sheet_name("tb_procedimento", &mut taken), "tb_procedimento");
        assert_eq!(
            sheet_name("rl_procedimento_compativel_com_cid", &mut taken),
            "rl_procedimento_compativel_com_"
        );
        assert_eq!(
            sheet_name("rl_procedimento_compativel_com_cbo", &mut taken),
            "rl_procedimento_compativel_co~1"
        );
        assert_eq!(sheet_name("TB_PROCEDIMENTO", &mut taken), "TB_PROCEDIMENTO~1");
        assert_eq!(sheet_name("tb:x/y", &mut taken), "tb_x_y");
        assert_eq!(sheet_name("", &mut taken), "sheet");
    }

    #[tokio::test]
    async fn test_export_writes_every_table() {
        let provider = provider().await;
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("sigtap_export.xlsx");

        let summary = export_workbook(&provider, &path, 10).await.unwrap();
        assert_eq!(summary, ExportSummary { tables: 2, rows: 25 });

        let workbook = archive_entry(&path, "xl/workbook.xml");
        assert!(workbook.contains("name=\"tb_procedimento\""));
        assert!(workbook.contains("name=\"rl_procedimento_compativel_com_\""));

        let strings = archive_entry(&path, "xl/sharedStrings.xml");
        assert!(strings.contains("co_procedimento"));
        assert!(strings.contains("Consulta 25"));
        assert!(!strings.contains("Consulta 7<"));
    }

    #[tokio::test]
    async fn test_empty_database_is_an_error() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("empty.xlsx");

        assert!(export_workbook(&SqliteProvider::new(pool), &path, 10).await.is_err());
        assert!(!path.exists());
    }
}
