//! Model Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::model::DimensionalModel;

pub struct ModelMetrics;

impl ModelMetrics {
    pub fn record_model(model: &DimensionalModel) {
        for (table, rows) in [
            ("dim_product", model.dim_product.num_rows()),
            ("dim_location", model.dim_location.num_rows()),
            ("fact_sales", model.fact_sales.num_rows()),
            ("fact_inventory", model.fact_inventory.num_rows()),
        ] {
            ::metrics::gauge!(phase_metric!(gauge, "model", "table_rows"), "table" => table).set(rows as f64);
        }
    }

    pub fn record_integrity_failure() {
        ::metrics::counter!(phase_metric!(counter, "model", "integrity_failures")).increment(1);
    }
}

impl PhaseMetrics for ModelMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge};

        let _ = gauge!(phase_metric!(gauge, "model", "table_rows"));
        let _ = counter!(phase_metric!(counter, "model", "integrity_failures"));
    }

    fn phase_name() -> &'static str {
        "model"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(gauge, "model", "table_rows"),
                metric_type: MetricType::Gauge,
                help: "Rows in each dimensional table of the last run",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "model", "integrity_failures"),
                metric_type: MetricType::Counter,
                help: "Model builds rejected by the referential completeness check",
                labels: vec![],
            },
        ]
    }
}
