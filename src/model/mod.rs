//! DimensionalModelBuilder: conformed tables in, star schema out.
//!
//! Dimensions and facts are derived independently from the same conformed
//! tables. No output is ever derived from another output.

pub mod dimension;
pub mod facts;
pub mod integrity;

pub use dimension::{build_dim_location, build_dim_product, build_dimension};
pub use facts::{build_fact_inventory, build_fact_sales};
pub use integrity::check_referential_completeness;

use std::sync::Arc;
use tracing::info;

use crate::constants::*;
use crate::error::Result;
use crate::table::Table;

/// The four dimensional tables of one run
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionalModel {
    pub dim_product: Table,
    pub dim_location: Table,
    pub fact_sales: Table,
    pub fact_inventory: Table,
}

impl DimensionalModel {
    /// Tables keyed by their published names
    pub fn into_tables(self) -> Vec<(String, Table)> {
        vec![
            (DIM_PRODUCT.to_string(), self.dim_product),
            (DIM_LOCATION.to_string(), self.dim_location),
            (FACT_SALES.to_string(), self.fact_sales),
            (FACT_INVENTORY.to_string(), self.fact_inventory),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionalModelBuilder {
    parallel: bool,
}

impl DimensionalModelBuilder {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Build every table on the calling thread
    pub fn build_sequential(&self, sales: &Table, inventory: &Table) -> Result<DimensionalModel> {
        let model = DimensionalModel {
            dim_product: build_dim_product(sales)?,
            dim_location: build_dim_location(sales)?,
            fact_sales: build_fact_sales(sales)?,
            fact_inventory: build_fact_inventory(inventory)?,
        };
        self.finish(model)
    }

    /// Build the model, running the four derivations as blocking tasks when parallel.
    /// Returns only after every derivation has finished.
    pub async fn build(&self, sales: Arc<Table>, inventory: Arc<Table>) -> Result<DimensionalModel> {
        if !self.parallel {
            return self.build_sequential(&sales, &inventory);
        }

        let products = {
            let sales = Arc::clone(&sales);
            tokio::task::spawn_blocking(move || build_dim_product(&sales))
        };
        let locations = {
            let sales = Arc::clone(&sales);
            tokio::task::spawn_blocking(move || build_dim_location(&sales))
        };
        let fact_sales = {
            let sales = Arc::clone(&sales);
            tokio::task::spawn_blocking(move || build_fact_sales(&sales))
        };
        let fact_inventory = tokio::task::spawn_blocking(move || build_fact_inventory(&inventory));

        let (products, locations, fact_sales, fact_inventory) =
            tokio::join!(products, locations, fact_sales, fact_inventory);

        let model = DimensionalModel {
            dim_product: products??,
            dim_location: locations??,
            fact_sales: fact_sales??,
            fact_inventory: fact_inventory??,
        };
        self.finish(model)
    }

    fn finish(&self, model: DimensionalModel) -> Result<DimensionalModel> {
        check_referential_completeness(&model.fact_sales, &model.dim_product, &model.dim_location)?;
        info!(
            "Built model: {} products, {} locations, {} sales facts, {} inventory facts",
            model.dim_product.num_rows(),
            model.dim_location.num_rows(),
            model.fact_sales.num_rows(),
            model.fact_inventory.num_rows()
        );
        Ok(model)
    }
}
