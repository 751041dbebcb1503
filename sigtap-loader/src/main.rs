mod dbf;
mod ddl;
mod input;
mod loader;
mod naming;
mod plan;
mod table;
mod writer;

use anyhow::{bail, Context};
use clap::Parser;
use loader::LoadOptions;
use sigtap_browser::delimited::TextEncoding;
use sigtap_browser::{DatabaseSettings, Settings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use writer::{MySqlWriter, TableWriter};

/// Load SIGTAP competence files (TXT/CSV/ZIP/DBF) into MySQL
#[derive(Debug, Parser)]
#[command(name = "sigtap-loader", version, about)]
struct Args {
    /// Competence folder or single file to load
    #[arg(short, long)]
    input: PathBuf,

    /// KEY=VALUE settings file with the database connection
    #[arg(long, default_value = ".env")]
    settings: PathBuf,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    database: Option<String>,

    /// Field delimiter of TXT/CSV files, detected when omitted (`\t` for tab)
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// Encoding of the input files (utf-8, cp1252, latin-1), detected when omitted
    #[arg(long, value_parser = parse_encoding)]
    encoding: Option<TextEncoding>,

    /// Drop and recreate tables before loading
    #[arg(long)]
    recreate: bool,

    /// Rows per INSERT statement
    #[arg(long, default_value_t = 25_000)]
    chunk_size: usize,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Parse files and report their tables without touching the database
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    /// Settings file and environment, overridden by the command line
    fn database_settings(&self) -> anyhow::Result<DatabaseSettings> {
        let mut database = Settings::load(&self.settings)
            .with_context(|| format!("loading settings from {}", self.settings.display()))?
            .database;

        if let Some(host) = &self.host {
            database.host = host.clone();
        }
        if let Some(port) = self.port {
            database.port = port;
        }
        if let Some(user) = &self.user {
            database.username = user.clone();
        }
        if let Some(password) = &self.password {
            database.password = password.clone();
        }
        if let Some(name) = &self.database {
            database.database = name.clone();
        }
        Ok(database)
    }
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match value.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("expected a single ASCII character, got {value:?}")),
        },
    }
}

fn parse_encoding(value: &str) -> Result<TextEncoding, String> {
    TextEncoding::from_label(value).ok_or_else(|| format!("unsupported encoding {value:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if !args.input.exists() {
        bail!("input not found: {}", args.input.display());
    }

    let settings = args.database_settings()?;
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: args.encoding,
        recreate: args.recreate,
    };

    if args.dry_run {
        info!(input = %args.input.display(), "dry run, the database is left untouched");
        loader::run(&args.input, &options, None).await?;
        return Ok(());
    }

    writer::ensure_database(&settings)
        .await
        .with_context(|| format!("creating database {}", settings.database))?;
    let mysql = MySqlWriter::connect(&settings, args.chunk_size)
        .await
        .with_context(|| format!("connecting to {}:{}", settings.host, settings.port))?;
    info!(database = ?settings, "connected");

    let result = loader::run(&args.input, &options, Some(&mysql as &dyn TableWriter)).await;
    mysql.close().await;
    result?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter("||").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_command_line_overrides_settings() {
        let directory = tempfile::tempdir().unwrap();
        let settings = directory.path().join("missing.env");
        let args = Args::parse_from([
            "sigtap-loader",
            "--input",
            "data",
            "--settings",
            settings.to_str().unwrap(),
            "--port",
            "3307",
            "--database",
            "sigtap_test",
        ]);

        let database = args.database_settings().unwrap();
        assert_eq!(database.port, 3307);
        assert_eq!(database.database, "sigtap_test");
        assert_eq!(args.chunk_size, 25_000);
        assert!(!args.recreate);
    }
}
