// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway::{AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Gateway configured:");
    tracing::info!("  Upstream: {}", config.upstream_url);
    tracing::info!("  Environment: {}", config.environment);
    tracing::info!("  Secure cookies: {}", config.secure_cookies());
    if config.log_ingest_token.is_some() {
        tracing::info!("  Log ingestion enabled");
    } else {
        tracing::warn!("LOG_INGEST_TOKEN not set - log ingestion will be rejected");
    }
    if !config.cors_origins.is_empty() {
        tracing::info!("  CORS origins: {:?}", config.cors_origins);
    }

    let addr = format!("{}:{}", config.bind_address, config.port);
    let state = AppState::new(config)?;
    let app = gateway::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
