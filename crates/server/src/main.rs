mod bootstrap;
mod health;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use deskbot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use deskbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config)?;

    let routes = Router::new()
        .merge(webhook::router(webhook::WebhookState { router: app.router.clone() }))
        .merge(health::router());

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "deskbot-server started"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let drained = Arc::new(tokio::sync::Notify::new());
    let signal = drained.clone();

    let server = axum::serve(listener, routes).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            "shutdown signal received, draining in-flight requests"
        );
        signal.notify_one();
    });

    // Drain in-flight requests for at most the configured grace period.
    tokio::select! {
        result = server => result?,
        _ = async {
            drained.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                "in-flight requests did not drain within the grace period"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "deskbot-server stopped"
    );

    Ok(())
}
