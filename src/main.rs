use std::sync::Arc;

use tracing::info;

mod ai;
mod bus;
mod calendar;
mod chat;
mod config;
mod error;
mod feed;
mod identity;
mod outbox;
mod server;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        // It's not fatal if .env doesn't exist, but good to know
        info!("No .env file found or failed to load: {}", e);
    }

    // Initialize logging with default filter if RUST_LOG is not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Forever Us daemon starting...");

    let config = config::Config::load();

    info!("Initializing store at {}", config.db_path.display());
    let store = store::Store::new(&config.db_path).await?;
    store.init().await?;

    let bus = Arc::new(bus::EventBus::new());

    // The outbox worker owns the durable-append side of the chat.
    let outbox = outbox::Outbox::spawn(store.clone(), bus.clone());

    let generators = ai::flows::Generators::new(&config);

    let api = server::ApiServer::new(store, bus, outbox, generators);
    let app = api.router();

    info!("Starting API server on port {}", config.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        res = axum::serve(listener, app) => {
            if let Err(e) = res {
                info!("Server stopped with error: {}", e);
            }
        }
    }

    Ok(())
}
