//! Per-run summary for operators, written as JSON whether or not the run succeeded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conform::{InventoryConformance, InventoryConformanceReport, SalesConformance, SalesConformanceReport};
use crate::error::{PipelineError, Result};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed {
        stage: String,
        kind: String,
        error: String,
    },
}

/// Row count and content hash of one published table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: usize,
    pub fingerprint: String,
}

impl TableSummary {
    pub fn of(table: &Table) -> Self {
        Self {
            rows: table.num_rows(),
            fingerprint: table.fingerprint(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub sales: Option<SalesConformanceReport>,
    pub inventory: Option<InventoryConformanceReport>,
    pub tables: BTreeMap<String, TableSummary>,
    pub total_revenue: Option<Decimal>,
    /// Rounded to cents; null when no sale survived
    pub mean_transaction_value: Option<Decimal>,
    pub low_stock_count: Option<usize>,
    pub out_of_stock_count: Option<usize>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            sales: None,
            inventory: None,
            tables: BTreeMap::new(),
            total_revenue: None,
            mean_transaction_value: None,
            low_stock_count: None,
            out_of_stock_count: None,
        }
    }

    pub fn record_sales(&mut self, sales: &SalesConformance) {
        let total: Decimal = sales.sales.iter().map(|s| s.total_revenue).sum();
        self.total_revenue = Some(total);
        self.mean_transaction_value = match sales.sales.len() {
            0 => None,
            n => Some((total / Decimal::from(n)).round_dp(2)),
        };
        self.sales = Some(sales.report.clone());
    }

    pub fn record_inventory(&mut self, inventory: &InventoryConformance) {
        self.low_stock_count = Some(inventory.report.low_stock);
        self.out_of_stock_count = Some(inventory.report.out_of_stock);
        self.inventory = Some(inventory.report.clone());
    }

    pub fn record_tables<'a>(&mut self, tables: impl IntoIterator<Item = (&'a str, &'a Table)>) {
        for (name, table) in tables {
            self.tables.insert(name.to_string(), TableSummary::of(table));
        }
    }

    pub fn succeed(&mut self) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, stage: &str, error: &PipelineError) {
        self.status = RunStatus::Failed {
            stage: stage.to_string(),
            kind: error.kind().to_string(),
            error: error.to_string(),
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 Run report written to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// One-line summary through tracing
    pub fn log_summary(&self) {
        match &self.status {
            RunStatus::Failed { stage, error, .. } => {
                warn!("Run {} failed in {}: {}", self.run_id, stage, error)
            }
            status => info!(
                "Run {} {:?}: {} tables, revenue {}, mean transaction {}, {} low stock, {} out of stock",
                self.run_id,
                status,
                self.tables.len(),
                display_opt(&self.total_revenue),
                display_opt(&self.mean_transaction_value),
                display_opt(&self.low_stock_count),
                display_opt(&self.out_of_stock_count),
            ),
        }
    }
}

fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(|| "n/a".to_string(), |v| v.to_string())
}
