//! MySQL table definitions for loaded data

use crate::naming::normalize_name;
use sigtap_browser::database::statement::quote_with;
use sigtap_browser::layout::FieldLayout;

const VARCHAR_DEFAULT_LENGTH: u32 = 255;
const TEXT_MAX_LENGTH: u32 = 65_535;
const DECIMAL_MAX_PRECISION: u32 = 65;

const TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

pub fn quote_identifier(identifier: &str) -> String {
    quote_with(identifier, '`')
}

/// Map a layout type (`VARCHAR2`, `NUMBER`, `CHAR`, ...) to a MySQL column type
pub fn mysql_type_for(data_type: &str, length: Option<u32>) -> String {
    let data_type = data_type.trim().to_lowercase();
    let length = length.filter(|length| *length > 0);
    let has = |fragment: &str| data_type.contains(fragment);

    if has("varchar") {
        return match length.unwrap_or(VARCHAR_DEFAULT_LENGTH) {
            length if length > TEXT_MAX_LENGTH => "TEXT".to_string(),
            length => format!("VARCHAR({length})"),
        };
    }
    if has("char") {
        return format!("CHAR({})", length.unwrap_or(1));
    }
    if has("text") || has("clob") || has("memo") {
        return match length {
            Some(length) if length > TEXT_MAX_LENGTH => "LONGTEXT".to_string(),
            _ => "TEXT".to_string(),
        };
    }
    if has("number") || has("numeric") || has("decimal") {
        return match length {
            Some(length) => format!("DECIMAL({},0)", length.min(DECIMAL_MAX_PRECISION)),
            None => "DECIMAL(38,0)".to_string(),
        };
    }
    if has("bigint") {
        return "BIGINT".to_string();
    }
    if has("int") {
        return "INT".to_string();
    }
    if has("date") && !has("time") {
        return "DATE".to_string();
    }
    if has("timestamp") || has("datetime") || has("date") {
        return "DATETIME".to_string();
    }
    if has("float") || has("double") {
        return "DOUBLE".to_string();
    }
    if has("bool") {
        return "TINYINT(1)".to_string();
    }
    "TEXT".to_string()
}

/// A column of a table created by the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
}

/// Typed columns for a fixed-width layout
///
/// Names are normalized; empty and repeated names are dropped.
pub fn layout_columns(fields: &[FieldLayout]) -> Vec<ColumnDefinition> {
    let mut columns: Vec<ColumnDefinition> = Vec::with_capacity(fields.len());
    for field in fields {
        let name = normalize_name(&field.name);
        if name.is_empty() || columns.iter().any(|column| column.name == name) {
            continue;
        }
        columns.push(ColumnDefinition {
            name,
            sql_type: mysql_type_for(&field.data_type, field.length),
        });
    }
    columns
}

/// `TEXT` columns for a delimited file
pub fn text_columns(names: &[String]) -> Vec<ColumnDefinition> {
    names
        .iter()
        .map(|name| ColumnDefinition {
            name: name.clone(),
            sql_type: "TEXT".to_string(),
        })
        .collect()
}

pub fn create_table_statement(table: &str, columns: &[ColumnDefinition]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|column| format!("{} {} NULL", quote_identifier(&column.name), column.sql_type))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) {}",
        quote_identifier(table),
        definitions.join(", "),
        TABLE_OPTIONS
    )
}

pub fn drop_table_statement(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
}

pub fn create_database_statement(database: &str) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
        quote_identifier(database)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, data_type: &str, length: Option<u32>) -> FieldLayout {
        FieldLayout {
            name: name.to_string(),
            length,
            start: None,
            end: None,
            data_type: data_type.to_string(),
        }
    }

    #[test]
    fn test_mysql_type_for() {
        assert_eq!(mysql_type_for("VARCHAR2", Some(250)), "VARCHAR(250)");
        assert_eq!(mysql_type_for("varchar", None), "VARCHAR(255)");
        assert_eq!(mysql_type_for("VARCHAR2", Some(70_000)), "TEXT");
        assert_eq!(mysql_type_for("CHAR", Some(10)), "CHAR(10)");
        assert_eq!(mysql_type_for("CHAR", Some(0)), "CHAR(1)");
        assert_eq!(mysql_type_for("CLOB", None), "TEXT");
        assert_eq!(mysql_type_for("memo", Some(100_000)), "LONGTEXT");
        assert_eq!(mysql_type_for("NUMBER", Some(12)), "DECIMAL(12,0)");
        assert_eq!(mysql_type_for("NUMBER", Some(80)), "DECIMAL(65,0)");
        assert_eq!(mysql_type_for("NUMBER", None), "DECIMAL(38,0)");
        assert_eq!(mysql_type_for("BIGINT", None), "BIGINT");
        assert_eq!(mysql_type_for("INTEGER", None), "INT");
        assert_eq!(mysql_type_for("DATE", None), "DATE");
        assert_eq!(mysql_type_for("TIMESTAMP", None), "DATETIME");
        assert_eq!(mysql_type_for("date time", None), "DATETIME");
        assert_eq!(mysql_type_for("double", None), "DOUBLE");
        assert_eq!(mysql_type_for("boolean", None), "TINYINT(1)");
        assert_eq!(mysql_type_for("blob", None), "TEXT");
    }

    #[test]
    fn test_layout_columns_skips_empty_and_repeated_names() {
        let columns = layout_columns(&[
            field("CO_GRUPO", "CHAR", Some(2)),
            field("NO GRUPO", "VARCHAR2", Some(100)),
            field("co_grupo", "NUMBER", None),
            field("***", "CHAR", Some(1)),
        ]);

        let names: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, ["co_grupo", "no_grupo"]);
        assert_eq!(columns[0].sql_type, "CHAR(2)");
    }

    #[test]
    fn test_create_table_statement() {
        let statement = create_table_statement(
            "tb_grupo",
            &text_columns(&["competencia".to_string(), "co_grupo".to_string()]),
        );
        assert_eq!(
            statement,
            "CREATE TABLE IF NOT EXISTS `tb_grupo` (`competencia` TEXT NULL, `co_grupo` TEXT NULL) \
             ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
        );
        assert_eq!(drop_table_statement("tb_grupo"), "DROP TABLE IF EXISTS `tb_grupo`");
    }
}
