use anyhow::Context;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use clap::Parser;
use sigtap_browser::{MySqlProvider, Settings, SigtapBrowser};
use sqlx::mysql::MySqlPool;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Browse the SIGTAP database from a web browser
#[derive(Debug, Parser)]
#[command(name = "sigtap-server", version, about)]
struct Args {
    /// KEY=VALUE settings file with the database connection
    #[arg(long, default_value = ".env")]
    settings: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Directory holding <table>_layout.txt / <table>_layout.csv files
    #[arg(long, default_value = ".")]
    layout_dir: PathBuf,

    /// URL path the browser is mounted at (empty for the root)
    #[arg(long, default_value = "")]
    base_path: String,
}

#[derive(Clone)]
struct ApplicationState {
    pool: MySqlPool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let settings = Settings::load(&args.settings)
        .with_context(|| format!("loading settings from {}", args.settings.display()))?;
    info!(database = ?settings.database, "settings loaded");

    // Connections open on first use, so the server comes up even without the database
    let provider = MySqlProvider::connect_lazy(&settings.database);
    let application_state = ApplicationState {
        pool: provider.pool().clone(),
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .with_state(application_state)
        .merge(
            SigtapBrowser::new(args.base_path.clone(), provider)
                .with_layout_dir(&args.layout_dir)
                .into_router(),
        );

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;

    info!(
        address = %args.bind,
        base_path = %args.base_path,
        layout_dir = %args.layout_dir.display(),
        "SIGTAP browser listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn health_handler(
    State(state): State<ApplicationState>,
) -> Result<(StatusCode, &'static str), StatusCode> {
    sqlx::query("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((StatusCode::OK, "Server is healthy"))
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await;
}

/// Resolve once `signal` fires; a failed listener never resolves
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("shutting down"),
        Err(error) => {
            warn!(%error, "failed to listen for ctrl-c, graceful shutdown disabled");
            std::future::pending::<()>().await;
        }
    }
}
