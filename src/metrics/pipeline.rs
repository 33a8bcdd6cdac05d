//! Pipeline Phase Metrics
//!
//! Stage-level health: runs, failures by error kind, durations and tables published.

use crate::metrics::core::TimingGuard;
use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Start timing a stage; the duration is recorded when the guard drops
    pub fn time_stage(stage: &'static str) -> TimingGuard {
        TimingGuard::new(phase_metric!(histogram, "pipeline", "stage_duration_seconds")).with_label("stage", stage)
    }

    pub fn record_stage_success(stage: &'static str, tables_published: usize) {
        ::metrics::counter!(phase_metric!(counter, "pipeline", "stage_runs"), "stage" => stage, "status" => "success")
            .increment(1);
        ::metrics::counter!(phase_metric!(counter, "pipeline", "tables_published"), "stage" => stage)
            .increment(tables_published as u64);
    }

    pub fn record_stage_failure(stage: &'static str, error_kind: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "pipeline", "stage_runs"), "stage" => stage, "status" => "failure")
            .increment(1);
        ::metrics::counter!(phase_metric!(counter, "pipeline", "errors"), "stage" => stage, "kind" => error_kind)
            .increment(1);
    }
}

impl PhaseMetrics for PipelineMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "pipeline", "stage_runs"));
        let _ = counter!(phase_metric!(counter, "pipeline", "tables_published"));
        let _ = counter!(phase_metric!(counter, "pipeline", "errors"));
        let _ = histogram!(phase_metric!(histogram, "pipeline", "stage_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "pipeline"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "pipeline", "stage_runs"),
                metric_type: MetricType::Counter,
                help: "Stage executions by outcome",
                labels: vec!["stage", "status"],
            },
            MetricDoc {
                name: phase_metric!(counter, "pipeline", "tables_published"),
                metric_type: MetricType::Counter,
                help: "Tables published to a layer store",
                labels: vec!["stage"],
            },
            MetricDoc {
                name: phase_metric!(counter, "pipeline", "errors"),
                metric_type: MetricType::Counter,
                help: "Fatal stage errors by kind",
                labels: vec!["stage", "kind"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "pipeline", "stage_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall-clock time of one stage, including reads and publish",
                labels: vec!["stage"],
            },
        ]
    }
}
