//! Parsing of data files into rows

use crate::naming::normalize_name;
use csv::StringRecord;
use sigtap_browser::layout::FieldLayout;

/// Parsed rows of one data file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    /// Put a constant column in front of every row
    pub fn prepend_column(&mut self, name: &str, value: &str) {
        if self.columns.iter().any(|column| column == name) {
            return;
        }
        self.columns.insert(0, name.to_string());
        for row in &mut self.rows {
            row.insert(0, Some(value.to_string()));
        }
    }
}

fn unique_name(name: String, taken: &[String]) -> String {
    if !taken.contains(&name) {
        return name;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{name}_{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Normalized and unique column names for a header, `col_<i>` standing in
/// for names that normalize to nothing
pub fn header_columns<'a>(header: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for (index, cell) in header.into_iter().enumerate() {
        let mut name = normalize_name(cell);
        if name.is_empty() {
            name = format!("col_{index}");
        }
        let name = unique_name(name, &columns);
        columns.push(name);
    }
    columns
}

/// Rows of a delimited file whose first record is the header
///
/// Header names are normalized (`col_<i>` when nothing is left) and made
/// unique. Records longer than the header are skipped, shorter ones are
/// padded with `NULL`.
pub fn read_delimited(records: &[StringRecord]) -> TableData {
    let Some((header, body)) = records.split_first() else {
        return TableData::default();
    };

    let columns = header_columns(header.iter());

    let mut rows = Vec::with_capacity(body.len());
    for (line, record) in body.iter().enumerate() {
        if record.len() > columns.len() {
            tracing::debug!(line = line + 2, fields = record.len(), "skipping malformed record");
            continue;
        }
        let mut row: Vec<Option<String>> = record.iter().map(|cell| Some(cell.to_string())).collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }

    TableData { columns, rows }
}

/// Rows of a fixed-width file
///
/// `start` and `end` are 1-based and inclusive, counted in characters.
/// A field without `start` begins at the first character; one without `end`
/// runs to the end of the line. Slices are trimmed and blank lines skipped.
/// Fields whose normalized names are empty or repeated are ignored.
pub fn read_fixed_width(text: &str, fields: &[FieldLayout]) -> TableData {
    let mut columns: Vec<String> = Vec::with_capacity(fields.len());
    let mut slices: Vec<(usize, Option<usize>)> = Vec::with_capacity(fields.len());
    for field in fields {
        let name = normalize_name(&field.name);
        if name.is_empty() || columns.contains(&name) {
            continue;
        }
        let start = field.start.unwrap_or(1).saturating_sub(1);
        columns.push(name);
        slices.push((start, field.end.map(|end| end.max(start))));
    }

    let mut rows = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let characters: Vec<char> = line.chars().collect();
        let row = slices
            .iter()
            .map(|&(start, end)| {
                let end = end.unwrap_or(characters.len()).min(characters.len());
                let start = start.min(end);
                let value: String = characters[start..end].iter().collect();
                Some(value.trim().to_string())
            })
            .collect();
        rows.push(row);
    }

    TableData { columns, rows }
}
