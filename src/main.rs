mod api;
mod config;
mod engine;
mod error;
mod feed;
mod geo;
mod launcher;
mod models;
mod notify;
mod observability;
mod state;
mod storage;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::storage::SessionStore;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let store: Arc<dyn SessionStore> = Arc::new(storage::FileStore::open(&config.storage_dir)?);
    let (app_state, position_rx) = state::AppState::new(&config, store.clone());

    // Restore runs before anything else can touch the machine; a session
    // that was active when the process died resumes here.
    match store.load() {
        Ok(record) => {
            app_state
                .lifecycle
                .lock()
                .await
                .restore(record, &app_state.destinations);
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load persisted navigation state; starting idle");
        }
    }

    let shared_state = Arc::new(app_state);
    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::tracker::run_tracking_engine(
        shared_state.clone(),
        position_rx,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
