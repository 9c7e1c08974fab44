use std::sync::Arc;

use anyhow::Context;
use starfish_gateway::background;
use starfish_gateway::config::AppConfig;
use starfish_gateway::models::rule::RewriteConfig;
use starfish_gateway::routes;
use starfish_gateway::services::upstream::{StarfishClient, Upstream};
use starfish_gateway::state::AppState;
use starfish_gateway::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("invalid configuration")?;

    telemetry::init(&config.log_level);

    tracing::info!("Starting starfish-gateway v{}", env!("CARGO_PKG_VERSION"));

    let rules = match &config.path_rewrite_config {
        Some(path) => {
            let rules = RewriteConfig::load(path)
                .with_context(|| format!("failed to load rewrite rules from {}", path.display()))?;
            tracing::info!(rules = rules.rules.len(), path = %path.display(), "Loaded rewrite rules");
            rules
        }
        None => {
            tracing::info!("No rewrite rules configured; keys are presented unchanged");
            RewriteConfig::default()
        }
    };

    let client = StarfishClient::from_config(&config).context("failed to build Starfish client")?;
    let upstream: Arc<dyn Upstream> = Arc::new(client);

    let state = AppState::new(config.clone(), &rules, upstream);

    match background::collections_refresher::refresh(&state).await {
        Ok(count) => tracing::info!(buckets = count, "Discovered collections"),
        Err(e) => tracing::warn!(
            error = %e,
            "Initial collections discovery failed; buckets appear after the next refresh"
        ),
    }

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let refresher_handle = tokio::spawn(background::collections_refresher::run(
        state.clone(),
        shutdown_rx,
    ));

    let app = routes::build_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    tracing::info!("Waiting for background tasks to finish");
    let _ = refresher_handle.await;

    let cleared = state.cache.clear();
    tracing::info!(cleared, "Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: tokio::sync::watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
}
