use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sheets_api_rust::config::{self, AppConfig};
use sheets_api_rust::state::AppState;

#[derive(Parser)]
#[command(name = "sheets-api")]
#[command(about = "REST API over spreadsheet tables")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (overrides SHEETS_API_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides SHEETS_API_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Serve users and tables from a YAML fixture instead of Postgres and Google Sheets")]
    fixture: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, GOOGLE_* etc.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let mut config: AppConfig = config::config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(fixture) = args.fixture {
        config.fixture.path = Some(fixture);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();

    tracing::info!("Starting Sheets API in {:?} mode", config.environment);

    let state = AppState::from_config(&config).context("failed to initialize collaborators")?;
    let app = sheets_api_rust::app(state, &config.server);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Sheets API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
