//! Sidecar layout files
//!
//! A table `tb_x` may ship with `tb_x_layout.txt` or `tb_x_layout.csv`, a
//! delimited file whose header holds a `Coluna` cell. The browser uses the
//! cells beneath it as the display order of the table's columns. The loader
//! reads the same files as fixed-width field layouts (`coluna`, `tamanho`,
//! `inicio`, `fim`, `tipo`).

use crate::delimited::{self, TextEncoding};
use csv::StringRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix of a layout file stem
pub const LAYOUT_SUFFIX: &str = "_layout";

/// Layout file extensions, in lookup order
pub const LAYOUT_EXTENSIONS: [&str; 2] = ["txt", "csv"];

const COLUMN_HEADER: &str = "Coluna";

/// Layout error type
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Failed to read layout {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed layout: {0}")]
    Csv(#[from] csv::Error),

    #[error("Layout is missing columns: {0}")]
    MissingColumns(String),
}

/// Locates and reads the layout files of a directory
#[derive(Debug, Clone)]
pub struct LayoutResolver {
    directory: PathBuf,
}

impl LayoutResolver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Candidate layout paths of a table, in lookup order
    pub fn candidates(&self, table: &str) -> Vec<PathBuf> {
        LAYOUT_EXTENSIONS
            .iter()
            .map(|extension| {
                self.directory
                    .join(format!("{}{}.{}", table, LAYOUT_SUFFIX, extension))
            })
            .collect()
    }

    /// First existing layout file of a table
    pub async fn locate(&self, table: &str) -> Option<PathBuf> {
        for candidate in self.candidates(table) {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    /// Column names listed by the table's layout file
    ///
    /// Empty when there is no layout file. A layout that cannot be read is
    /// logged and treated as absent.
    pub async fn display_columns(&self, table: &str) -> Vec<String> {
        let Some(path) = self.locate(table).await else {
            return Vec::new();
        };

        match read_layout_records(&path, None).await {
            Ok(records) => display_columns(&records),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring unreadable layout file");
                Vec::new()
            }
        }
    }
}

/// Read a layout file into records, detecting its delimiter
pub async fn read_layout_records(
    path: &Path,
    encoding: Option<TextEncoding>,
) -> Result<Vec<StringRecord>, LayoutError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = delimited::decode(&bytes, encoding);
    let records = delimited::read_records(&text, delimited::detect_delimiter(&text))?;
    Ok(records)
}

/// Table name a layout path belongs to (`tb_x_layout.csv` -> `tb_x`)
pub fn layout_table_name(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if !LAYOUT_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let lowered = stem.to_ascii_lowercase();
    lowered
        .strip_suffix(LAYOUT_SUFFIX)
        .filter(|base| !base.is_empty())
        .map(|base| stem[..base.len()].to_string())
}

/// Column names beneath the `Coluna` header cell
///
/// The header is matched exactly first, then ignoring case. Cells are
/// trimmed and empty ones skipped.
pub fn display_columns(records: &[StringRecord]) -> Vec<String> {
    let Some(header) = records.first() else {
        return Vec::new();
    };

    let position = header
        .iter()
        .position(|cell| cell.trim() == COLUMN_HEADER)
        .or_else(|| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(COLUMN_HEADER))
        });
    let Some(position) = position else {
        return Vec::new();
    };

    records[1..]
        .iter()
        .filter_map(|record| record.get(position))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Final display order of a table's columns
///
/// Layout entries present in the table keep the layout order; anything else
/// is dropped. Without layout entries the table order is used.
///
/// Entries match ignoring ASCII case, as MySQL column names do, and resolve
/// to the table's own spelling so that row keys line up.
pub fn resolve_columns(layout: &[String], table_columns: &[String]) -> Vec<String> {
    if layout.is_empty() {
        return table_columns.to_vec();
    }

    layout
        .iter()
        .filter_map(|entry| {
            table_columns
                .iter()
                .find(|column| *column == entry)
                .or_else(|| table_columns.iter().find(|column| column.eq_ignore_ascii_case(entry)))
        })
        .cloned()
        .collect()
}

/// One field of a fixed-width layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Raw column name, as written in the layout
    pub name: String,

    /// Declared length (`tamanho`)
    pub length: Option<u32>,

    /// First character, 1-based (`inicio`)
    pub start: Option<usize>,

    /// Last character, 1-based and inclusive (`fim`)
    pub end: Option<usize>,

    /// Declared type (`tipo`), e.g. `VARCHAR2`, `NUMBER`, `CHAR`
    pub data_type: String,
}

/// Parse a loader layout: header cells `coluna`, `tamanho`, `inicio`, `fim`
/// and `tipo`, matched ignoring case
///
/// Rows without a name are skipped; unparsable numbers become `None`.
pub fn field_layouts(records: &[StringRecord]) -> Result<Vec<FieldLayout>, LayoutError> {
    const REQUIRED: [&str; 5] = ["coluna", "tamanho", "inicio", "fim", "tipo"];

    let header: Vec<String> = records
        .first()
        .map(|record| record.iter().map(|cell| cell.trim().to_lowercase()).collect())
        .unwrap_or_default();
    let index_of = |name: &str| header.iter().position(|cell| cell == name);

    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|name| index_of(*name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(LayoutError::MissingColumns(missing.join(", ")));
    }

    let [name, length, start, end, data_type] = REQUIRED.map(|name| index_of(name).unwrap_or(0));
    let cell = |record: &StringRecord, index: usize| record.get(index).unwrap_or("").trim().to_string();

    let mut fields = Vec::new();
    for record in records.iter().skip(1) {
        let field_name = cell(record, name);
        if field_name.is_empty() {
            continue;
        }
        fields.push(FieldLayout {
            name: field_name,
            length: cell(record, length).parse().ok(),
            start: cell(record, start).parse().ok(),
            end: cell(record, end).parse().ok(),
            data_type: cell(record, data_type),
        });
    }

    Ok(fields)
}
