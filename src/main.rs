//! Quarry server binary.
//!
//! Loads settings from the environment (plus `.env`), wires the
//! application state and serves the REST API. Missing provider
//! credentials disable the nlp surface instead of preventing startup.

use quarry::{api, AppState, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for secrets (SECRET_KEY, OPENAI_API_KEY, ...)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quarry server");

    let settings = Settings::from_env();

    if settings.openai_api_key.is_none() && settings.cohere_api_key.is_none() {
        tracing::warn!("no provider credentials configured; nlp endpoints will answer 503");
    }

    let host = settings.host.clone();
    let port = settings.port;

    let state = AppState::build(settings).await?;
    let router = api::create_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("Listening on {}:{}", host, port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install shutdown handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
