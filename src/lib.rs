//! Batch retail pipeline: raw POS, e-commerce and warehouse extracts are
//! conformed into canonical tables and assembled into a star schema.

pub mod config;
pub mod conform;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod raw;
pub mod report;
pub mod store;
pub mod table;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{LayerStores, PipelineRunner};
pub use report::RunReport;
