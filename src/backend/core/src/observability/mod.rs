//! Observability: logging, distributed tracing, and metrics.

pub mod metrics;

use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the tracing stack.
///
/// `RUST_LOG` wins over the configured level. Spans are exported over OTLP
/// only when an endpoint is configured.
pub fn init(service_name: &str, config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let tracer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => Some(
            opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(
                    opentelemetry_sdk::trace::config().with_resource(opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", service_name.to_string()),
                    ])),
                )
                .install_batch(opentelemetry_sdk::runtime::Tokio)?,
        ),
        None => None,
    };

    let json = config.json_logging;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .try_init()?;

    tracing::info!(
        service_name,
        otlp = config.otlp_endpoint.is_some(),
        "Observability initialized"
    );

    Ok(())
}

/// Flush and shut down the OpenTelemetry pipeline.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}
