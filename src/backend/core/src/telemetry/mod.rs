//! Telemetry: logging and metrics initialization.
//!
//! Structured logging goes through `tracing` with an env-filter; metrics
//! are recorded with the `metrics` facade and optionally exported on a
//! Prometheus scrape endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use palisade_core::config::ObservabilityConfig;
//! use palisade_core::telemetry::init_telemetry;
//!
//! init_telemetry(&ObservabilityConfig::default()).expect("telemetry init failed");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize logging and, if configured, the Prometheus exporter.
///
/// `RUST_LOG` takes precedence over the configured log level. Calling this
/// twice returns an error from the subscriber registry.
pub fn init_telemetry(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init()?;
    }

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "prometheus exporter listening");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        json = config.json_logging,
        "telemetry initialized"
    );
    Ok(())
}
