//! Jobboard Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;

use jobboard_core::{
    api::{self, AppState},
    config::Config,
    db::{Database, JobStore},
    enrichment::{AggregatorSettings, FlowClient, HttpFlowClient, PagedEnrichmentAggregator, WorkerPool},
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // `--config <path>` beats JOBBOARD_CONFIG
    let config_path = std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .or_else(|| std::env::var("JOBBOARD_CONFIG").ok());
    let config = Config::load(config_path.as_deref())?;

    observability::init("jobboard-server", &config.observability)?;
    let metrics = observability::metrics::install_recorder()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        flow = %config.flow.base_url,
        "Starting Jobboard Server"
    );

    // Connect to database
    let db = Database::new(&config.database).await?;
    db.migrate().await?;
    let store: Arc<dyn JobStore> = Arc::new(db.job_store());

    // One pool for the whole process
    let pool = Arc::new(WorkerPool::new(config.enrichment.pool_config()));
    let flow: Arc<dyn FlowClient> = Arc::new(HttpFlowClient::from_config(&config.flow)?);
    let aggregator = Arc::new(PagedEnrichmentAggregator::new(
        pool,
        flow.clone(),
        AggregatorSettings::from_config(&config.flow, &config.enrichment),
    ));

    let app_state = AppState::new(store, flow, aggregator, config.flow.clone()).with_metrics(metrics);
    let app = api::build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    observability::shutdown();
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
}
