//! Phase-organized metrics for the retail pipeline
//!
//! Each pipeline phase defines its own metrics in a dedicated submodule, so
//! names stay unique and every metric has one owner.

pub mod conformance;
pub mod core;
pub mod model;
pub mod pipeline;
pub mod registry;

pub use conformance::ConformanceMetrics;
pub use model::ModelMetrics;
pub use pipeline::PipelineMetrics;

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

use crate::config::MetricsConfig;

static INIT: Once = Once::new();

/// Install the Prometheus recorder and register every phase's metrics.
///
/// Idempotent. Without a `listen_addr` nothing is installed and the `metrics`
/// macros stay no-ops.
pub fn init_metrics(config: &MetricsConfig) {
    let Some(addr_str) = config.listen_addr.as_deref() else {
        return;
    };
    INIT.call_once(|| {
        let addr = match addr_str.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}; metrics disabled", addr_str, e);
                return;
            }
        };

        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                info!("Prometheus HTTP exporter started at http://{}/metrics", addr);
                registry::register_all_metrics();
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

/// Every pipeline phase implements this so its metrics are registered and documented up front
pub trait PhaseMetrics {
    /// Touch every metric of the phase so it is exported before the first event
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Metric name with the naming convention `retail_{phase}_{name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("retail_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("retail_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("retail_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
