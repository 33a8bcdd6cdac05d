use async_trait::async_trait;
use tracing::{info, instrument};

use super::{Layer, PipelineStage, StageDetails, StageInputs, StageOutput};
use crate::conform::{ConformanceEngine, DateOrder};
use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::metrics::{ConformanceMetrics, ModelMetrics};
use crate::model::DimensionalModelBuilder;

/// Raw extracts -> `sales_unified` + `inventory_clean`
#[derive(Debug, Clone, Copy)]
pub struct ConformanceStage {
    engine: ConformanceEngine,
    parallel: bool,
}

impl ConformanceStage {
    pub fn new(date_order: DateOrder, parallel: bool) -> Self {
        Self {
            engine: ConformanceEngine::new(date_order),
            parallel,
        }
    }
}

#[async_trait]
impl PipelineStage for ConformanceStage {
    fn stage_name(&self) -> &'static str {
        "conformance"
    }

    fn input_layer(&self) -> Layer {
        Layer::Raw
    }

    fn output_layer(&self) -> Layer {
        Layer::Conformed
    }

    fn inputs(&self) -> Vec<&'static str> {
        raw_tables()
    }

    fn outputs(&self) -> Vec<&'static str> {
        vec![SALES_UNIFIED, INVENTORY_CLEAN]
    }

    #[instrument(skip_all, fields(stage = "conformance", parallel = self.parallel))]
    async fn execute(&self, inputs: StageInputs) -> Result<StageOutput> {
        let pos = inputs.get(POS_TRANSACTIONS)?;
        let ecommerce = inputs.get(ECOMMERCE_ORDERS)?;
        let warehouse = inputs.get(WAREHOUSE_INVENTORY)?;
        let engine = self.engine;

        // Sales and inventory share no data; both must finish before anything is published
        let (sales, inventory) = if self.parallel {
            let sales = tokio::task::spawn_blocking(move || engine.unify_sales(&pos, &ecommerce));
            let inventory = tokio::task::spawn_blocking(move || engine.clean_inventory(&warehouse));
            let (sales, inventory) = tokio::join!(sales, inventory);
            (sales??, inventory??)
        } else {
            (engine.unify_sales(&pos, &ecommerce)?, engine.clean_inventory(&warehouse)?)
        };

        ConformanceMetrics::record_sales(&sales.report);
        ConformanceMetrics::record_inventory(&inventory.report);
        info!(
            "✅ Conformed {} sales ({} dropped) and {} inventory positions",
            sales.report.rows_out,
            sales.report.dropped.total(),
            inventory.report.rows_out
        );

        Ok(StageOutput {
            tables: vec![
                (SALES_UNIFIED.to_string(), sales.table.clone()),
                (INVENTORY_CLEAN.to_string(), inventory.table.clone()),
            ],
            details: StageDetails::Conformance { sales, inventory },
        })
    }
}

/// Conformed tables -> dimensions and facts
#[derive(Debug, Clone, Copy)]
pub struct ModelStage {
    builder: DimensionalModelBuilder,
}

impl ModelStage {
    pub fn new(parallel: bool) -> Self {
        Self {
            builder: DimensionalModelBuilder::new(parallel),
        }
    }
}

#[async_trait]
impl PipelineStage for ModelStage {
    fn stage_name(&self) -> &'static str {
        "model"
    }

    fn input_layer(&self) -> Layer {
        Layer::Conformed
    }

    fn output_layer(&self) -> Layer {
        Layer::Model
    }

    fn inputs(&self) -> Vec<&'static str> {
        vec![SALES_UNIFIED, INVENTORY_CLEAN]
    }

    fn outputs(&self) -> Vec<&'static str> {
        vec![DIM_PRODUCT, DIM_LOCATION, FACT_SALES, FACT_INVENTORY]
    }

    #[instrument(skip_all, fields(stage = "model"))]
    async fn execute(&self, inputs: StageInputs) -> Result<StageOutput> {
        let sales = inputs.get(SALES_UNIFIED)?;
        let inventory = inputs.get(INVENTORY_CLEAN)?;

        let model = self.builder.build(sales, inventory).await.map_err(|e| {
            if matches!(e, PipelineError::Integrity(_)) {
                ModelMetrics::record_integrity_failure();
            }
            e
        })?;
        ModelMetrics::record_model(&model);

        Ok(StageOutput {
            tables: model.clone().into_tables(),
            details: StageDetails::Model(model),
        })
    }
}
