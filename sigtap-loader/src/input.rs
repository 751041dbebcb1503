//! Input file discovery

use anyhow::Context;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{error, info, warn};
use zip::ZipArchive;

/// Extensions loaded as data or layouts
const DATA_EXTENSIONS: [&str; 3] = ["txt", "csv", "dbf"];

const ARCHIVE_EXTENSION: &str = "zip";

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_archive(path: &Path) -> bool {
    extension_of(path).as_deref() == Some(ARCHIVE_EXTENSION)
}

/// Files of one load run
///
/// Archive contents live in temporary directories that are removed when
/// this value is dropped.
#[derive(Debug, Default)]
pub struct InputFiles {
    pub files: Vec<PathBuf>,
    extracted: Vec<TempDir>,
}

/// Collect the loadable files under `input`, sorted
///
/// A file input is taken as-is. Directories are walked recursively. ZIP
/// archives are extracted and their TXT/CSV/DBF members take their place;
/// archives nested inside them are skipped, and an archive that fails to
/// extract is logged and left out.
pub fn collect_files(input: &Path) -> io::Result<InputFiles> {
    let candidates = if input.is_file() {
        vec![input.to_path_buf()]
    } else {
        let mut files = Vec::new();
        walk_directory(input, &mut files)?;
        files.sort();
        files
    };

    let mut collected = InputFiles::default();
    for path in candidates {
        if !is_archive(&path) {
            collected.files.push(path);
            continue;
        }

        match extract_archive(&path) {
            Ok((directory, members)) => {
                info!(path = %path.display(), files = members.len(), "archive extracted");
                collected.files.extend(members);
                collected.extracted.push(directory);
            }
            Err(error) => {
                error!(path = %path.display(), error = %format!("{error:#}"), "failed to extract archive");
            }
        }
    }
    Ok(collected)
}

fn walk_directory(directory: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_directory(&path, files)?;
            continue;
        }

        match extension_of(&path) {
            Some(extension)
                if DATA_EXTENSIONS.contains(&extension.as_str()) || extension == ARCHIVE_EXTENSION =>
            {
                files.push(path)
            }
            _ => {}
        }
    }
    Ok(())
}

/// Extract an archive into `<temporary directory>/<archive stem>/`
///
/// Keeping the stem in the path lets a competence in the archive name
/// reach its members.
fn extract_archive(archive: &Path) -> anyhow::Result<(TempDir, Vec<PathBuf>)> {
    let directory = tempfile::Builder::new()
        .prefix("sigtap_zip_")
        .tempdir()
        .context("creating temporary directory")?;
    let target = directory.path().join(archive.file_stem().unwrap_or_default());

    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    ZipArchive::new(file)?.extract(&target)?;

    let mut members = Vec::new();
    walk_directory(&target, &mut members)?;
    members.retain(|member| {
        let nested = is_archive(member);
        if nested {
            warn!(path = %member.display(), "skipping nested archive");
        }
        !nested
    });
    members.sort();

    Ok((directory, members))
}
