//! ConformanceEngine: raw extracts in, canonical `sales_unified` and
//! `inventory_clean` tables out.

pub mod dates;
pub mod inventory;
pub mod mapping;
pub mod quality;
pub mod sales;

pub use dates::{DateOrder, DateParser};
pub use inventory::{InventoryConformance, InventoryConformanceReport};
pub use mapping::{CanonicalField, SalesSource, StagedSale};
pub use quality::{DropCounts, QualityViolation};
pub use sales::{SalesConformance, SalesConformanceReport};

use crate::error::Result;
use crate::table::Table;

/// Applies one date policy to every record of a run
#[derive(Debug, Clone, Copy, Default)]
pub struct ConformanceEngine {
    parser: DateParser,
}

impl ConformanceEngine {
    pub fn new(order: DateOrder) -> Self {
        Self {
            parser: DateParser::new(order),
        }
    }

    pub fn date_order(&self) -> DateOrder {
        self.parser.order()
    }

    pub fn unify_sales(&self, pos: &Table, ecommerce: &Table) -> Result<SalesConformance> {
        sales::unify_sales(&self.parser, pos, ecommerce)
    }

    pub fn clean_inventory(&self, raw: &Table) -> Result<InventoryConformance> {
        inventory::clean_inventory(&self.parser, raw)
    }
}
