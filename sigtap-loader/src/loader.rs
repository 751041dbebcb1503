//! Load run: layouts first, then every data file in order

use crate::dbf::{self, read_dbf};
use crate::ddl;
use crate::input::collect_files;
use crate::naming::normalize_name;
use crate::plan::{plan_file, FilePlan, Layouts, Source, COMPETENCE_COLUMN};
use crate::table::{read_delimited, read_fixed_width, TableData};
use crate::writer::TableWriter;
use anyhow::Context;
use sigtap_browser::delimited::{self, TextEncoding};
use sigtap_browser::layout::{field_layouts, layout_table_name};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Characters inspected when guessing the delimiter of a data file
const DELIMITER_SAMPLE_CHARS: usize = 100_000;

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fixed delimiter; detected per file when unset
    pub delimiter: Option<u8>,
    /// Fixed encoding; UTF-8 with Windows-1252 fallback when unset
    pub encoding: Option<TextEncoding>,
    pub recreate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files: usize,
    pub failed: usize,
    pub rows: u64,
}

async fn read_text(path: &Path, encoding: Option<TextEncoding>) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(delimited::decode(&bytes, encoding).into_owned())
}

fn delimiter_for(text: &str, options: &LoadOptions) -> u8 {
    options.delimiter.unwrap_or_else(|| {
        let sample_end = text
            .char_indices()
            .nth(DELIMITER_SAMPLE_CHARS)
            .map_or(text.len(), |(index, _)| index);
        delimited::detect_delimiter(&text[..sample_end])
    })
}

async fn read_delimited_file(path: &Path, options: &LoadOptions) -> anyhow::Result<TableData> {
    let text = read_text(path, options.encoding).await?;
    let records = delimited::read_records(&text, delimiter_for(&text, options))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(read_delimited(&records))
}

/// Parse every `<table>_layout.txt|csv` among `files`
///
/// Layouts without the fixed-width columns are skipped with a warning.
pub async fn load_layouts(files: &[PathBuf], options: &LoadOptions) -> Layouts {
    let mut layouts = Layouts::new();

    for path in files {
        let Some(table) = layout_table_name(path).map(|name| normalize_name(&name)) else {
            continue;
        };

        let text = match read_text(path, options.encoding).await {
            Ok(text) => text,
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "skipping unreadable layout");
                continue;
            }
        };
        let parsed = delimited::read_records(&text, delimiter_for(&text, options))
            .map_err(Into::into)
            .and_then(|records| field_layouts(&records));

        match parsed {
            Ok(fields) => {
                info!(path = %path.display(), table = %table, columns = fields.len(), "layout found");
                layouts.insert(table, fields);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping invalid layout");
            }
        }
    }

    layouts
}

/// Rows of a planned file, ready for its table
async fn read_planned(
    plan: &FilePlan,
    layouts: &Layouts,
    options: &LoadOptions,
) -> anyhow::Result<TableData> {
    match plan.source {
        Source::FixedWidth => {
            let fields = layouts.get(&plan.table).map(Vec::as_slice).unwrap_or_default();
            let text = read_text(&plan.path, options.encoding).await?;
            let mut data = read_fixed_width(&text, fields);
            // Typed columns reject empty strings
            for cell in data.rows.iter_mut().flatten() {
                if cell.as_deref() == Some("") {
                    *cell = None;
                }
            }
            Ok(data)
        }
        Source::Delimited | Source::Dbf => {
            let mut data = if plan.source == Source::Dbf {
                let path = plan.path.clone();
                let encoding = options.encoding.unwrap_or(dbf::DEFAULT_ENCODING);
                tokio::task::spawn_blocking(move || read_dbf(&path, encoding))
                    .await?
                    .with_context(|| format!("reading {}", plan.path.display()))?
            } else {
                read_delimited_file(&plan.path, options).await?
            };
            if let Some(competence) = &plan.competence {
                data.prepend_column(COMPETENCE_COLUMN, competence);
            }
            Ok(data)
        }
    }
}

/// Load everything under `input`
///
/// Without a writer nothing is written: each file is still parsed and its
/// destination reported. Failures of single files are logged and counted.
pub async fn run(
    input: &Path,
    options: &LoadOptions,
    writer: Option<&dyn TableWriter>,
) -> anyhow::Result<LoadSummary> {
    let input_files =
        collect_files(input).with_context(|| format!("listing {}", input.display()))?;
    let files = &input_files.files;
    if files.is_empty() {
        warn!(input = %input.display(), "no .txt, .csv, .zip or .dbf files found");
        return Ok(LoadSummary::default());
    }

    let layouts = load_layouts(files, options).await;
    if let Some(writer) = writer {
        for (table, fields) in &layouts {
            match writer
                .create_table(table, &ddl::layout_columns(fields), options.recreate)
                .await
            {
                Ok(()) => info!(table = %table, "table created from layout"),
                Err(error) => error!(table = %table, %error, "failed to create table from layout"),
            }
        }
    }

    let mut summary = LoadSummary::default();
    let mut recreated: HashSet<String> = HashSet::new();

    for path in files {
        let Some(plan) = plan_file(path, &layouts) else {
            continue;
        };
        summary.files += 1;

        match load_file(&plan, &layouts, options, writer, &mut recreated).await {
            Ok(rows) => {
                summary.rows += rows;
                info!(path = %plan.path.display(), table = %plan.table, rows, "file loaded");
            }
            Err(error) => {
                summary.failed += 1;
                error!(path = %plan.path.display(), table = %plan.table, error = %format!("{error:#}"), "failed to load file");
            }
        }
    }

    info!(files = summary.files, failed = summary.failed, rows = summary.rows, "load finished");
    Ok(summary)
}

async fn load_file(
    plan: &FilePlan,
    layouts: &Layouts,
    options: &LoadOptions,
    writer: Option<&dyn TableWriter>,
    recreated: &mut HashSet<String>,
) -> anyhow::Result<u64> {
    let data = read_planned(plan, layouts, options).await?;

    let Some(writer) = writer else {
        info!(path = %plan.path.display(), table = %plan.table, rows = data.rows.len(), "dry run");
        return Ok(0);
    };

    if data.columns.is_empty() {
        warn!(path = %plan.path.display(), "no columns, nothing to load");
        return Ok(0);
    }
    if data.rows.is_empty() {
        warn!(path = %plan.path.display(), "empty file");
    }

    if plan.source != Source::FixedWidth {
        let recreate = options.recreate && recreated.insert(plan.table.clone());
        writer
            .create_table(&plan.table, &ddl::text_columns(&data.columns), recreate)
            .await
            .with_context(|| format!("creating table {}", plan.table))?;
    }

    let written = writer
        .insert_rows(&plan.table, &data)
        .await
        .with_context(|| format!("inserting into {}", plan.table))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::ColumnDefinition;
    use async_trait::async_trait;
    use std::fs;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        created: Mutex<Vec<(String, Vec<String>, bool)>>,
        inserted: Mutex<Vec<(String, TableData)>>,
    }

    #[async_trait]
    impl TableWriter for RecordingWriter {
        async fn create_table(
            &self,
            table: &str,
            columns: &[ColumnDefinition],
            recreate: bool,
        ) -> Result<(), sqlx::Error> {
            let names = columns.iter().map(|column| column.name.clone()).collect();
            self.created.lock().unwrap().push((table.to_string(), names, recreate));
            Ok(())
        }

        async fn insert_rows(&self, table: &str, data: &TableData) -> Result<u64, sqlx::Error> {
            self.inserted.lock().unwrap().push((table.to_string(), data.clone()));
            Ok(data.rows.len() as u64)
        }
    }

    fn competence_directory() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("TabelaUnificada_202401");
        fs::create_dir(&directory).unwrap();
        fs::write(
            directory.join("tb_grupo_layout.txt"),
            "Coluna,Tamanho,Inicio,Fim,Tipo\nCO_GRUPO,2,1,2,VARCHAR2\nNO_GRUPO,11,3,13,VARCHAR2\nVL_X,4,14,17,NUMBER\n",
        )
        .unwrap();
        fs::write(directory.join("tb_grupo.txt"), "01Diagnostico1234\n02Clinicos\n").unwrap();
        fs::write(directory.join("rl_extra.csv"), "CO_A|NO B\n1|um\n2|dois\n").unwrap();
        fs::write(directory.join("broken_layout.csv"), "Coluna;Tipo\nx;CHAR\n").unwrap();
        root
    }

    #[tokio::test]
    async fn test_run_loads_layout_and_delimited_files() {
        let root = competence_directory();
        let writer = RecordingWriter::default();
        let options = LoadOptions {
            recreate: true,
            ..LoadOptions::default()
        };

        let summary = run(root.path(), &options, Some(&writer)).await.unwrap();
        assert_eq!(summary, LoadSummary { files: 2, failed: 0, rows: 4 });

        let created = writer.created.lock().unwrap();
        assert_eq!(
            created[0],
            (
                "tb_grupo".to_string(),
                vec!["co_grupo".to_string(), "no_grupo".to_string(), "vl_x".to_string()],
                true
            )
        );
        assert_eq!(
            created[1],
            (
                "rl_extra_202401".to_string(),
                vec!["competencia".to_string(), "co_a".to_string(), "no_b".to_string()],
                true
            )
        );

        let inserted = writer.inserted.lock().unwrap();
        let (table, extra) = &inserted[0];
        assert_eq!(table, "rl_extra_202401");
        assert_eq!(extra.rows[1], [Some("202401".to_string()), Some("2".to_string()), Some("dois".to_string())]);

        let (table, grupo) = &inserted[1];
        assert_eq!(table, "tb_grupo");
        assert_eq!(grupo.rows[0][2].as_deref(), Some("1234"));
        assert_eq!(grupo.rows[1][2], None);
    }

    #[tokio::test]
    async fn test_recreate_drops_delimited_table_once() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("tb_a.csv"), "x\n1\n").unwrap();
        fs::write(root.path().join("TB A.csv"), "x\n2\n").unwrap();
        let writer = RecordingWriter::default();
        let options = LoadOptions {
            recreate: true,
            ..LoadOptions::default()
        };

        run(root.path(), &options, Some(&writer)).await.unwrap();

        let flags: Vec<bool> = writer.created.lock().unwrap().iter().map(|entry| entry.2).collect();
        assert_eq!(flags, [true, false]);
    }

    #[tokio::test]
    async fn test_run_loads_archive_members() {
        let root = tempfile::tempdir().unwrap();
        let archive = fs::File::create(root.path().join("TabelaUnificada_202405.zip")).unwrap();
        let mut archive = zip::ZipWriter::new(archive);
        for (name, content) in [
            ("tb_grupo_layout.txt", "Coluna,Tamanho,Inicio,Fim,Tipo\nCO_GRUPO,2,1,2,VARCHAR2\nNO_GRUPO,11,3,13,VARCHAR2\n"),
            ("tb_grupo.txt", "01Diagnostico\n"),
            ("rl_extra.csv", "co_a\n1\n"),
        ] {
            archive.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
            archive.write_all(content.as_bytes()).unwrap();
        }
        archive.finish().unwrap();

        let writer = RecordingWriter::default();
        let summary = run(root.path(), &LoadOptions::default(), Some(&writer)).await.unwrap();
        assert_eq!(summary, LoadSummary { files: 2, failed: 0, rows: 2 });

        let inserted = writer.inserted.lock().unwrap();
        let tables: Vec<&str> = inserted.iter().map(|(table, _)| table.as_str()).collect();
        assert_eq!(tables, ["rl_extra_202405", "tb_grupo"]);
        assert_eq!(inserted[1].1.rows[0][1].as_deref(), Some("Diagnostico"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let root = competence_directory();
        let summary = run(root.path(), &LoadOptions::default(), None).await.unwrap();
        assert_eq!(summary, LoadSummary { files: 2, failed: 0, rows: 0 });
    }

    #[tokio::test]
    async fn test_invalid_layout_is_skipped() {
        let root = competence_directory();
        let input = collect_files(root.path()).unwrap();
        let layouts = load_layouts(&input.files, &LoadOptions::default()).await;
        assert_eq!(layouts.keys().collect::<Vec<_>>(), ["tb_grupo"]);
    }
}
