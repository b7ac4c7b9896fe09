//! ThreatFlow SOC Dashboard Server
//!
//! Serves the prediction API and the live anomaly feed on top of the
//! ThreatFlow event pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   THREATFLOW SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────┐   ┌─────────────────────┐  │
//! │  │  Capture  │──▶│  Pipeline   │──▶│  Subscribers (/ws)  │  │
//! │  │  (eve.json│   │  (thread)   │   └─────────────────────┘  │
//! │  │   tail)   │   │  normalize  │   ┌─────────────────────┐  │
//! │  └───────────┘   │  score      │──▶│  Anomaly journal    │  │
//! │                  │  explain    │   └─────────────────────┘  │
//! │  ┌───────────┐   └──────┬──────┘                            │
//! │  │  API      │──────────┘ (shared analyzer, history)        │
//! │  │  (Axum)   │                                              │
//! │  └───────────┘                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use threatflow_core::{capture, explain};
use threatflow_core::{AnomalyJournal, EnsembleScorer, EventPipeline, FlowAnalyzer, PipelineState, SubscriberRegistry};

pub use error::{AppError, AppResult};
pub use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "threatflow_server=debug,threatflow_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env().context("invalid configuration")?;
    let service = &config.service;

    tracing::info!("ThreatFlow server starting...");
    tracing::info!("Models: {}", service.artifacts.tabular.parent().map(|p| p.display().to_string()).unwrap_or_default());

    // Scoring collaborators are required
    let scorer = EnsembleScorer::load(&service.artifacts, service.policy)
        .context("failed to load scoring models")?;
    let explainer = Arc::from(explain::from_config(&service.explainer));
    let analyzer = FlowAnalyzer::new(Arc::new(scorer), explainer);

    let journal = Arc::new(AnomalyJournal::new(&service.anomaly_log));
    tracing::info!("Anomaly journal: {}", journal.path().display());

    let pipeline = Arc::new(
        EventPipeline::new(
            analyzer,
            Arc::new(PipelineState::new(service.history)),
            Arc::new(SubscriberRegistry::new()),
        )
        .with_journal(journal),
    );

    // Live pipeline
    let stop = Arc::new(AtomicBool::new(false));
    let worker = match capture::from_config(&service.capture, stop.clone())? {
        Some(source) => Some(Arc::clone(&pipeline).spawn(source).context("failed to start pipeline thread")?),
        None => {
            tracing::warn!("CAPTURE_SOURCE not set; live pipeline disabled, serving predictions only");
            None
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_router(AppState::new(pipeline, config));

    tracing::info!("🚀 Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Models are released once the pipeline thread lets go of its Arc
    stop.store(true, Ordering::Relaxed);
    if let Some(worker) = worker {
        let joined = tokio::time::timeout(
            Duration::from_secs(2),
            tokio::task::spawn_blocking(move || worker.join()),
        ).await;
        match joined {
            Ok(Ok(Ok(summary))) => tracing::info!("Pipeline stopped after {} flows", summary.processed),
            Ok(_) => tracing::error!("Pipeline thread panicked"),
            Err(_) => tracing::warn!("Pipeline still blocked on its source; exiting anyway"),
        }
    }

    tracing::info!("ThreatFlow server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the main router with all routes
pub(crate) fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::info))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/predict/batch", post(handlers::predict::predict_batch))
        .route("/api/stats", get(handlers::history::stats))
        .route("/api/events", get(handlers::history::events))
        .route("/api/anomalies", get(handlers::history::anomalies))
        .route("/ws", get(handlers::stream::ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
