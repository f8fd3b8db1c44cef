//! Astro Catalog - entry point
//!
//! Loads configuration, opens the storage engine and serves the REST API
//! until Ctrl-C.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use astro_catalog::cli::CliOptions;
use astro_catalog::config::{Config, LogFormat};
use astro_catalog::orm::Repository;
use astro_catalog::{AppState, build_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?.with_cli(&CliOptions::from_args());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "astro_catalog=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        storage = %config.storage,
        "Starting Astro Catalog"
    );

    let store = db::connect(&config.store_config()).await?;
    let repository = Repository::new(store.clone(), config.storage_timeout);

    let addr = config.bind_addr()?;
    let app = build_app(AppState::new(config, repository));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shutting down");
    store.close().await;
    tracing::info!("Storage closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
