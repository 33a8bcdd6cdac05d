//! Conformance Phase Metrics
//!
//! Row accounting for sales unification and inventory cleaning: rows in, rows
//! dropped per quality reason, rows out and clamped stock.

use crate::conform::{InventoryConformanceReport, QualityViolation, SalesConformanceReport};
use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ConformanceMetrics;

impl ConformanceMetrics {
    pub fn record_sales(report: &SalesConformanceReport) {
        ::metrics::counter!(phase_metric!(counter, "conformance", "rows_in"), "table" => "sales")
            .increment(report.rows_in as u64);
        ::metrics::counter!(phase_metric!(counter, "conformance", "rows_out"), "table" => "sales")
            .increment(report.rows_out as u64);
        for violation in [
            QualityViolation::DuplicateKey,
            QualityViolation::MissingRequired,
            QualityViolation::OutOfRange,
        ] {
            ::metrics::counter!(
                phase_metric!(counter, "conformance", "rows_dropped"),
                "reason" => violation.as_str()
            )
            .increment(report.dropped.get(violation) as u64);
        }
    }

    pub fn record_inventory(report: &InventoryConformanceReport) {
        ::metrics::counter!(phase_metric!(counter, "conformance", "rows_in"), "table" => "inventory")
            .increment(report.rows_in as u64);
        ::metrics::counter!(phase_metric!(counter, "conformance", "rows_out"), "table" => "inventory")
            .increment(report.rows_out as u64);
        ::metrics::counter!(phase_metric!(counter, "conformance", "stock_clamped"))
            .increment(report.negative_stock_clamped as u64);
        ::metrics::gauge!(phase_metric!(gauge, "conformance", "low_stock_positions"))
            .set(report.low_stock as f64);
        ::metrics::gauge!(phase_metric!(gauge, "conformance", "out_of_stock_positions"))
            .set(report.out_of_stock as f64);
    }
}

impl PhaseMetrics for ConformanceMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge};

        let _ = counter!(phase_metric!(counter, "conformance", "rows_in"));
        let _ = counter!(phase_metric!(counter, "conformance", "rows_out"));
        let _ = counter!(phase_metric!(counter, "conformance", "rows_dropped"));
        let _ = counter!(phase_metric!(counter, "conformance", "stock_clamped"));
        let _ = gauge!(phase_metric!(gauge, "conformance", "low_stock_positions"));
        let _ = gauge!(phase_metric!(gauge, "conformance", "out_of_stock_positions"));
    }

    fn phase_name() -> &'static str {
        "conformance"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "conformance", "rows_in"),
                metric_type: MetricType::Counter,
                help: "Raw rows read by conformance",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "conformance", "rows_out"),
                metric_type: MetricType::Counter,
                help: "Conformed rows written",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "conformance", "rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Sales rows filtered by a quality rule",
                labels: vec!["reason"],
            },
            MetricDoc {
                name: phase_metric!(counter, "conformance", "stock_clamped"),
                metric_type: MetricType::Counter,
                help: "Inventory rows whose negative stock was clamped to zero",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(gauge, "conformance", "low_stock_positions"),
                metric_type: MetricType::Gauge,
                help: "Inventory positions below their reorder level in the last run",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(gauge, "conformance", "out_of_stock_positions"),
                metric_type: MetricType::Gauge,
                help: "Inventory positions with zero stock in the last run",
                labels: vec![],
            },
        ]
    }
}
