use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::{validate_order, ConformanceStage, Layer, ModelStage, PipelineStage, StageDetails, StageInputs};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::report::RunReport;
use crate::store::{FsTableStore, InMemoryTableStore, TableStore};

/// One table store per layer
#[derive(Clone)]
pub struct LayerStores {
    raw: Arc<dyn TableStore>,
    conformed: Arc<dyn TableStore>,
    model: Arc<dyn TableStore>,
}

impl LayerStores {
    pub fn new(raw: Arc<dyn TableStore>, conformed: Arc<dyn TableStore>, model: Arc<dyn TableStore>) -> Self {
        Self { raw, conformed, model }
    }

    /// Filesystem stores under `data_dir/{raw,conformed,model}`
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(FsTableStore::new(config.raw_dir())),
            Arc::new(FsTableStore::new(config.conformed_dir())),
            Arc::new(FsTableStore::new(config.model_dir())),
        )
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryTableStore::new()),
            Arc::new(InMemoryTableStore::new()),
            Arc::new(InMemoryTableStore::new()),
        )
    }

    pub fn get(&self, layer: Layer) -> &dyn TableStore {
        match layer {
            Layer::Raw => self.raw.as_ref(),
            Layer::Conformed => self.conformed.as_ref(),
            Layer::Model => self.model.as_ref(),
        }
    }
}

/// Runs stages in order; a stage either publishes every output or none
pub struct PipelineRunner {
    stores: LayerStores,
}

impl PipelineRunner {
    pub fn new(stores: LayerStores) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &LayerStores {
        &self.stores
    }

    /// Conformance followed by the dimensional model
    pub fn full_pipeline(config: &PipelineConfig) -> Vec<Box<dyn PipelineStage>> {
        vec![
            Box::new(ConformanceStage::new(config.date_order, config.parallel)),
            Box::new(ModelStage::new(config.parallel)),
        ]
    }

    /// Read inputs, execute, then publish all outputs in one `write_tables` call
    #[instrument(skip_all, fields(stage = stage.stage_name()))]
    pub async fn run_stage(&self, stage: &dyn PipelineStage, report: &mut RunReport) -> Result<()> {
        let name = stage.stage_name();
        let timing = PipelineMetrics::time_stage(name);
        info!("🔄 Running stage '{}' ({} -> {})", name, stage.input_layer(), stage.output_layer());

        let source = self.stores.get(stage.input_layer());
        let mut inputs = StageInputs::new();
        for table_name in stage.inputs() {
            let table = source.read_table(table_name).await?;
            debug!("Read {} ({} rows) from {} layer", table_name, table.num_rows(), stage.input_layer());
            inputs.insert(table_name, table);
        }

        let output = stage.execute(inputs).await?;
        output.check_declared(name, &stage.outputs())?;

        self.stores.get(stage.output_layer()).write_tables(&output.tables).await?;
        for (table_name, table) in &output.tables {
            debug!("Published {} ({} rows) to {} layer", table_name, table.num_rows(), stage.output_layer());
        }

        report.record_tables(output.tables.iter().map(|(n, t)| (n.as_str(), t)));
        if let StageDetails::Conformance { sales, inventory } = &output.details {
            report.record_sales(sales);
            report.record_inventory(inventory);
        }

        PipelineMetrics::record_stage_success(name, output.tables.len());
        info!(
            "✅ Stage '{}' published {} tables in {:.2}s",
            name,
            output.tables.len(),
            timing.elapsed_secs()
        );
        Ok(())
    }

    /// Run every stage and return the report; never panics on a failed run
    pub async fn run(&self, stages: &[Box<dyn PipelineStage>]) -> RunReport {
        let mut report = RunReport::start();
        info!("🚀 Starting run {} with {} stage(s)", report.run_id, stages.len());

        if let Err(e) = validate_order(stages) {
            error!("❌ Invalid pipeline: {}", e);
            report.fail("validation", &e);
            return report;
        }

        for stage in stages {
            if let Err(e) = self.run_stage(stage.as_ref(), &mut report).await {
                error!("❌ Stage '{}' failed: {}", stage.stage_name(), e);
                PipelineMetrics::record_stage_failure(stage.stage_name(), e.kind());
                report.fail(stage.stage_name(), &e);
                report.log_summary();
                return report;
            }
        }

        report.succeed();
        report.log_summary();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::error::PipelineError;
    use crate::report::RunStatus;
    use crate::table::{ScalarType, Schema, Table, Value};
    use rust_decimal::Decimal;

    async fn seed_raw(stores: &LayerStores, order_date: &str) {
        let pos = Table::new(
            POS_TRANSACTIONS,
            Schema::of(&[
                ("transaction_id", ScalarType::Utf8),
                ("date", ScalarType::Utf8),
                ("store_id", ScalarType::Utf8),
                ("product_id", ScalarType::Utf8),
                ("quantity", ScalarType::Int64),
                ("sale_price", ScalarType::Decimal),
            ]),
            vec![vec![
                Value::from("T1"),
                Value::from("2024-01-05"),
                Value::from("S1"),
                Value::from("P1"),
                Value::Int64(2),
                Value::Decimal(Decimal::new(1000, 2)),
            ]],
        )
        .unwrap();
        let ecommerce = Table::new(
            ECOMMERCE_ORDERS,
            Schema::of(&[
                ("order_id", ScalarType::Utf8),
                ("order_date", ScalarType::Utf8),
                ("shipping_city", ScalarType::Utf8),
                ("product_id", ScalarType::Utf8),
                ("quantity", ScalarType::Int64),
                ("unit_price", ScalarType::Decimal),
            ]),
            vec![vec![
                Value::from("E1"),
                Value::from(order_date),
                Value::from("Mumbai"),
                Value::from("P2"),
                Value::Int64(1),
                Value::Decimal(Decimal::new(500, 2)),
            ]],
        )
        .unwrap();
        let inventory = Table::new(
            WAREHOUSE_INVENTORY,
            Schema::of(&[
                (WAREHOUSE_ID, ScalarType::Utf8),
                (PRODUCT_ID, ScalarType::Utf8),
                (STOCK_ON_HAND, ScalarType::Int64),
                (REORDER_LEVEL, ScalarType::Int64),
                (LAST_UPDATED, ScalarType::Utf8),
            ]),
            vec![vec![
                Value::from("W1"),
                Value::from("P1"),
                Value::Int64(-1),
                Value::Int64(5),
                Value::from("2024-01-05 09:00:00"),
            ]],
        )
        .unwrap();
        stores
            .get(Layer::Raw)
            .write_tables(&[
                (POS_TRANSACTIONS.to_string(), pos),
                (ECOMMERCE_ORDERS.to_string(), ecommerce),
                (WAREHOUSE_INVENTORY.to_string(), inventory),
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_run_publishes_every_layer() {
        let stores = LayerStores::in_memory();
        seed_raw(&stores, "2024-01-06").await;
        let runner = PipelineRunner::new(stores.clone());

        let report = runner.run(&PipelineRunner::full_pipeline(&PipelineConfig::default())).await;

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(
            stores.get(Layer::Conformed).list_tables().await.unwrap(),
            vec![INVENTORY_CLEAN, SALES_UNIFIED]
        );
        assert_eq!(stores.get(Layer::Model).list_tables().await.unwrap().len(), 4);
        assert_eq!(report.tables.len(), 6);
        assert_eq!(report.total_revenue, Some(Decimal::new(2500, 2)));
        assert_eq!(report.out_of_stock_count, Some(1));
        assert_eq!(report.inventory.as_ref().map(|i| i.negative_stock_clamped), Some(1));
    }

    #[tokio::test]
    async fn test_parse_failure_publishes_nothing_for_the_stage() {
        let stores = LayerStores::in_memory();
        seed_raw(&stores, "not a date").await;
        let runner = PipelineRunner::new(stores.clone());

        let report = runner.run(&PipelineRunner::full_pipeline(&PipelineConfig::default())).await;

        assert!(matches!(
            report.status,
            RunStatus::Failed { ref stage, ref kind, .. } if stage == "conformance" && kind == "parse"
        ));
        assert!(stores.get(Layer::Conformed).list_tables().await.unwrap().is_empty());
        assert!(stores.get(Layer::Model).list_tables().await.unwrap().is_empty());
        assert!(report.tables.is_empty());
    }

    #[tokio::test]
    async fn test_model_without_conformed_layer_is_source_missing() {
        let stores = LayerStores::in_memory();
        let runner = PipelineRunner::new(stores);
        let mut report = RunReport::start();

        let err = runner.run_stage(&ModelStage::new(true), &mut report).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceMissing(ref t) if t == SALES_UNIFIED));
    }

    #[tokio::test]
    async fn test_bad_order_fails_validation() {
        let runner = PipelineRunner::new(LayerStores::in_memory());
        let mut stages = PipelineRunner::full_pipeline(&PipelineConfig::default());
        stages.reverse();

        let report = runner.run(&stages).await;
        assert!(matches!(report.status, RunStatus::Failed { ref stage, .. } if stage == "validation"));
    }
}
