//! Staged pipeline: raw layer -> conformance -> dimensional model.
//!
//! Each stage reads whole tables from the previous layer's store and publishes
//! all of its outputs in a single `write_tables` call, or nothing on failure.

pub mod runner;
pub mod stages;

pub use runner::{LayerStores, PipelineRunner};
pub use stages::{ConformanceStage, ModelStage};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::conform::{InventoryConformance, SalesConformance};
use crate::error::{PipelineError, Result};
use crate::model::DimensionalModel;
use crate::table::Table;

/// Storage layer a stage reads from or writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Raw,
    Conformed,
    Model,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Raw => "raw",
            Layer::Conformed => "conformed",
            Layer::Model => "model",
        };
        f.write_str(name)
    }
}

/// Common trait for all pipeline stages
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage_name(&self) -> &'static str;

    fn input_layer(&self) -> Layer;

    fn output_layer(&self) -> Layer;

    /// Tables read from the input layer
    fn inputs(&self) -> Vec<&'static str>;

    /// Tables this stage must publish, all at once
    fn outputs(&self) -> Vec<&'static str>;

    async fn execute(&self, inputs: StageInputs) -> Result<StageOutput>;
}

/// The tables a stage declared as inputs, already read
#[derive(Debug, Default, Clone)]
pub struct StageInputs {
    tables: HashMap<String, Arc<Table>>,
}

impl StageInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), Arc::new(table));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::SourceMissing(name.to_string()))
    }
}

/// What a stage learned about its data, folded into the run report
#[derive(Debug, Clone)]
pub enum StageDetails {
    Conformance {
        sales: SalesConformance,
        inventory: InventoryConformance,
    },
    Model(DimensionalModel),
}

#[derive(Debug, Clone)]
pub struct StageOutput {
    pub tables: Vec<(String, Table)>,
    pub details: StageDetails,
}

impl StageOutput {
    /// Every declared output present exactly once, and nothing undeclared
    pub fn check_declared(&self, stage: &str, declared: &[&'static str]) -> Result<()> {
        let produced: Vec<&str> = self.tables.iter().map(|(name, _)| name.as_str()).collect();
        let unique: HashSet<&str> = produced.iter().copied().collect();
        let expected: HashSet<&str> = declared.iter().copied().collect();
        if unique.len() != produced.len() || unique != expected {
            return Err(PipelineError::Config(format!(
                "Stage '{}' produced {:?} but declares {:?}",
                stage, produced, declared
            )));
        }
        Ok(())
    }
}

/// Reject a stage that reads a table only a later stage produces
pub fn validate_order(stages: &[Box<dyn PipelineStage>]) -> Result<()> {
    if stages.is_empty() {
        return Err(PipelineError::Config("Pipeline must have at least one stage".to_string()));
    }
    for (i, stage) in stages.iter().enumerate() {
        for input in stage.inputs() {
            if let Some(later) = stages[i..].iter().find(|s| s.outputs().contains(&input)) {
                return Err(PipelineError::Config(format!(
                    "Stage '{}' depends on '{}' which stage '{}' produces later in the pipeline",
                    stage.stage_name(),
                    input,
                    later.stage_name()
                )));
            }
        }
    }
    Ok(())
}
