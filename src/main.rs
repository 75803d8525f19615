use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use listee_api::config::AppConfig;
use listee_api::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "listee-api", about = "Listee category and task API server", version)]
struct Args {
    /// Interface to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides LISTEE_API_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("listee_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let config: &AppConfig = listee_api::config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Listee API in {:?} mode", config.environment);

    let database = DatabaseManager::connect_lazy(&config.database)
        .context("failed to configure database pool")?;
    let state = listee_api::build_state(config, &database).context("failed to build app state")?;
    let app = listee_api::app(state, &config.security);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listee API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
