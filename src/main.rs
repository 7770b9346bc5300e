// Keywarden Proxy - Zero-knowledge credential injection gateway
//
// The MITM transport drives the dispatcher through the library API; this
// binary wires configuration, logging, and a small localhost admin surface
// (health + counters) around it.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use keywarden_proxy::{build, config, Dispatcher, ProxyStats, StatsSnapshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("keywarden proxy starting");

    let document = config::load();
    let built = build(&document)?;
    let stats = Arc::new(ProxyStats::default());
    let dispatcher = Dispatcher::new(built, stats.clone());

    tracing::info!(
        strategies = ?dispatcher.strategy_names(),
        rules = dispatcher.rule_count(),
        fail_mode = ?dispatcher.fail_mode(),
        "dispatcher ready"
    );

    let app = Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats_snapshot))
        .with_state(stats.clone());

    let addr = std::env::var("KEYWARDEN_ADMIN_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3200".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "admin endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    stats.log_summary();
    Ok(())
}

/// RUST_LOG wins; LOG_LEVEL is honored for parity with older deployments.
fn log_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();
    EnvFilter::try_new(format!("keywarden_proxy={level}"))
        .unwrap_or_else(|_| EnvFilter::new("keywarden_proxy=info"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn stats_snapshot(State(stats): State<Arc<ProxyStats>>) -> Json<StatsSnapshot> {
    Json(stats.snapshot())
}
