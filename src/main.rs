//! DeFi Risk Sentinel - Main Entry Point
//!
//! Loads the anomaly model if present and serves risk scores, anomaly
//! decisions and portfolio assessments over HTTP.

use anyhow::{Context, Result};
use defi_risk_sentinel::{
    api,
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::ModelLoader,
    scoring::{RiskScoreStore, ScoringService},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting DeFi Risk Sentinel");
    info!(
        "Anomaly threshold: {:.2}, severity: medium>{:.2}, high>{:.2}, mock mode: {}",
        config.detection.anomaly_threshold,
        config.detection.severity.medium,
        config.detection.severity.high,
        config.detection.mock_mode
    );

    let metrics = Arc::new(ServiceMetrics::new());

    let detector = ModelLoader::new(&config.models.model_path).load().into_detector();
    let store = Arc::new(RiskScoreStore::new(&config.scoring));
    let service = Arc::new(
        ScoringService::new(&config, store, detector, metrics.clone())
            .context("Failed to initialize scoring service")?,
    );

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = api::create_router(service, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Sentinel shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("defi_risk_sentinel={},tower_http=info", logging.level)))
        .context("Invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
