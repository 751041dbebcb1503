mod workbook;

use anyhow::Context;
use clap::Parser;
use sigtap_browser::{MySqlProvider, Settings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Export every table of the SIGTAP database to an Excel workbook, one
/// sheet per table
#[derive(Debug, Parser)]
#[command(name = "sigtap-export", version, about)]
struct Args {
    /// KEY=VALUE settings file with the database connection
    #[arg(long, default_value = ".env")]
    settings: PathBuf,

    /// Workbook to write
    #[arg(short, long, default_value = "sigtap_export.xlsx")]
    output: PathBuf,

    /// Rows fetched per query
    #[arg(long, default_value_t = 10_000)]
    batch_size: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.settings)
        .with_context(|| format!("loading settings from {}", args.settings.display()))?;
    info!(database = ?settings.database, output = %args.output.display(), "exporting");

    let provider = MySqlProvider::connect_lazy(&settings.database);
    let result = workbook::export_workbook(&provider, &args.output, args.batch_size).await;
    provider.pool().close().await;
    result?;

    Ok(())
}
