//! Registers every phase's metrics and detects name conflicts early

use crate::metrics::{ConformanceMetrics, MetricDoc, ModelMetrics, PhaseMetrics, PipelineMetrics};
use std::collections::HashMap;
use tracing::{info, warn};

pub fn register_all_metrics() {
    let all_metrics = collect_documentation(true);
    info!("Registered {} total metrics across all phases", all_metrics.len());

    if std::env::var("RETAIL_METRICS_DEBUG").is_ok() {
        log_metrics_summary(&all_metrics);
    }
}

/// Documentation for every metric, keyed by name; optionally registers them too
pub fn collect_documentation(register: bool) -> HashMap<&'static str, (&'static str, MetricDoc)> {
    let mut all_metrics = HashMap::new();
    add_phase::<ConformanceMetrics>(&mut all_metrics, register);
    add_phase::<ModelMetrics>(&mut all_metrics, register);
    add_phase::<PipelineMetrics>(&mut all_metrics, register);
    all_metrics
}

fn add_phase<T: PhaseMetrics>(
    all_metrics: &mut HashMap<&'static str, (&'static str, MetricDoc)>,
    register: bool,
) {
    if register {
        T::register_metrics();
    }
    let phase_name = T::phase_name();
    for doc in T::metrics_documentation() {
        let named_phase = extract_phase_from_metric_name(doc.name);
        if named_phase != phase_name {
            warn!(
                "Metric '{}' is documented by phase '{}' but named for phase '{}'; skipping",
                doc.name, phase_name, named_phase
            );
        } else if let Some((owner, _)) = all_metrics.get(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' is defined in both '{}' and '{}'",
                doc.name, owner, phase_name
            );
        } else {
            all_metrics.insert(doc.name, (phase_name, doc));
        }
    }
}

fn log_metrics_summary(all_metrics: &HashMap<&'static str, (&'static str, MetricDoc)>) {
    let mut names: Vec<&&str> = all_metrics.keys().collect();
    names.sort();
    for name in names {
        let (phase, doc) = &all_metrics[*name];
        info!("  - [{}] {} ({:?}): {}", phase, doc.name, doc.metric_type, doc.help);
    }
}

/// Phase segment of a metric name ("retail_model_table_rows" -> "model")
pub fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    metric_name
        .strip_prefix("retail_")
        .and_then(|rest| rest.split('_').next())
        .filter(|phase| !phase.is_empty())
        .unwrap_or("unknown")
}
