// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::ingestion_service::IngestionService;
use crate::application::pipeline::{PipelineSettings, StatePipeline};
use crate::application::streaming_service::StreamingDashboardService;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::mqtt;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    current_state, dashboard, duty_cycle, health_check, stream_dashboard, timeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = load_monitor_config().context("Failed to load configuration")?;

    // Core pipeline (application layer)
    let settings = PipelineSettings::from_config(&config);
    let inbound_channels = settings.inbound_channels();
    tracing::info!(
        threshold = settings.threshold.value,
        comparison = ?settings.threshold.comparison,
        retention = ?settings.retention,
        relay = settings.relay.is_some(),
        "Starting state pipeline"
    );

    // Transport (infrastructure layer)
    let (bridge, publisher) = mqtt::connect(&config.broker, inbound_channels);
    let (inbound_tx, inbound_rx) = mpsc::channel(config.broker.queue_capacity);

    let (ingestion, snapshots) =
        IngestionService::new(StatePipeline::new(settings), Arc::new(publisher));
    let ingestion_task = tokio::spawn(ingestion.run(inbound_rx));
    tokio::spawn(bridge.run(inbound_tx));

    // Renderer-facing services
    let title = format!("{} monitor", config.channels.raw_current);
    let dashboard_service =
        DashboardService::new(snapshots, title, config.timeline.annotation_offset);
    let streaming_service = StreamingDashboardService::new(
        dashboard_service.clone(),
        config.server.refresh_interval(),
    );

    let state = Arc::new(AppState {
        dashboard_service,
        streaming_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/state", get(current_state))
        .route("/duty-cycle", get(duty_cycle))
        .route("/timeline", get(timeline))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server.bind;
    tracing::info!("Starting device-state-monitor on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // The snapshot behind every endpoint goes stale once ingestion stops, so
    // the process stops with it.
    tokio::select! {
        result = axum::serve(listener, router).into_future() => {
            result.context("HTTP server failed")?;
        }
        result = ingestion_task => {
            result.context("Ingestion task panicked")?;
            anyhow::bail!("Ingestion stopped");
        }
    }

    Ok(())
}
