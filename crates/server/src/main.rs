mod audit_sink;
mod bootstrap;
mod health;
mod inventory_source;
mod nlu_client;
mod routes;

use std::time::Duration;

use anyhow::Result;
use brewline_core::config::{AppConfig, LoadOptions};

use crate::health::HealthState;
use crate::inventory_source::{spawn_inventory_load, warn_not_configured};
use crate::routes::MessageState;

fn init_logging(config: &AppConfig) {
    use brewline_core::config::LogFormat::*;
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
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    match app.inventory_source.clone() {
        Some(source) => {
            spawn_inventory_load(
                source,
                app.runtime.clone(),
                app.inventory_load.clone(),
                app.audit.clone(),
            );
        }
        None => warn_not_configured(),
    }

    let message_state = MessageState {
        runtime: app.runtime.clone(),
        nlu: app.nlu.clone(),
        workspace_id: app.config.nlu.workspace_id().map(str::to_string),
    };
    let health_state =
        HealthState { runtime: app.runtime.clone(), inventory_load: app.inventory_load.clone() };
    let router =
        routes::router(message_state, health_state, app.config.server.static_dir.as_deref());

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        static_dir = ?app.config.server.static_dir,
        "brewline-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(grace)).await?;

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "brewline-server stopped"
    );
    Ok(())
}

// Resolves on ctrl-c, then arms a hard deadline for in-flight requests.
async fn wait_for_shutdown(grace: Duration) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "shutdown requested; draining in-flight requests"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(
            event_name = "system.server.forced_exit",
            correlation_id = "shutdown",
            "graceful shutdown window elapsed"
        );
        std::process::exit(1);
    });
}
