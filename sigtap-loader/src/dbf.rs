//! dBase (`.dbf`) tables

use crate::table::{header_columns, TableData};
use dbase::encoding::EncodingRs;
use dbase::FieldValue;
use sigtap_browser::delimited::TextEncoding;
use std::path::Path;

/// Encoding of character fields when none is given
pub const DEFAULT_ENCODING: TextEncoding = TextEncoding::Windows1252;

/// Every record of a DBF file, rendered as text
///
/// Column names are normalized like delimited headers. Character fields are
/// trimmed; blank and missing values become `NULL`; dates are written as
/// `AAAAMMDD`.
pub fn read_dbf(path: &Path, encoding: TextEncoding) -> Result<TableData, dbase::Error> {
    let mut reader =
        dbase::Reader::from_path_with_encoding(path, EncodingRs::from(encoding.encoding()))?;

    let fields: Vec<String> = reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let columns = header_columns(fields.iter().map(String::as_str));

    let mut rows = Vec::new();
    for record in reader.iter_records() {
        let record = record?;
        let row = fields
            .iter()
            .map(|field| record.get(field).and_then(field_text))
            .collect();
        rows.push(row);
    }

    Ok(TableData { columns, rows })
}

fn field_text(value: &FieldValue) -> Option<String> {
    let text = match value {
        FieldValue::Character(text) => text.as_deref().map(str::trim).map(str::to_string),
        FieldValue::Memo(text) => Some(text.trim().to_string()),
        FieldValue::Numeric(number) => number.map(|number| number.to_string()),
        FieldValue::Float(number) => number.map(|number| number.to_string()),
        FieldValue::Logical(flag) => flag.map(|flag| flag.to_string()),
        FieldValue::Integer(number) => Some(number.to_string()),
        FieldValue::Double(number) | FieldValue::Currency(number) => Some(number.to_string()),
        FieldValue::Date(date) => date
            .as_ref()
            .map(|date| format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())),
        other => Some(format!("{other:?}")),
    };
    text.filter(|text| !text.is_empty())
}
