//! Raw layer boundary: source extracts become immutable raw tables stamped with
//! ingestion metadata. No cleaning happens here.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::conform::SalesSource;
use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::store::TableStore;
use crate::table::json::table_from_json_str;
use crate::table::{Column, ScalarType, Schema, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSource {
    Pos,
    Ecommerce,
    Warehouse,
}

impl RawSource {
    pub const ALL: [RawSource; 3] = [RawSource::Pos, RawSource::Ecommerce, RawSource::Warehouse];

    pub fn table_name(&self) -> &'static str {
        match self {
            RawSource::Pos => POS_TRANSACTIONS,
            RawSource::Ecommerce => ECOMMERCE_ORDERS,
            RawSource::Warehouse => WAREHOUSE_INVENTORY,
        }
    }

    pub fn system_label(&self) -> &'static str {
        match self {
            RawSource::Pos => POS_SYSTEM,
            RawSource::Ecommerce => ECOMMERCE_SYSTEM,
            RawSource::Warehouse => WAREHOUSE_SYSTEM,
        }
    }

    /// Columns every extract of this source carries
    pub fn extract_columns(&self) -> Vec<&'static str> {
        let sales_columns = |source: SalesSource| -> Vec<&'static str> {
            source.mapping().iter().map(|(_, column)| *column).collect()
        };
        match self {
            RawSource::Pos => sales_columns(SalesSource::Pos),
            RawSource::Ecommerce => sales_columns(SalesSource::Ecommerce),
            RawSource::Warehouse => vec![WAREHOUSE_ID, PRODUCT_ID, STOCK_ON_HAND, REORDER_LEVEL, LAST_UPDATED],
        }
    }

    /// Schema of an extract with no records: the declared columns, untyped text
    pub fn empty_extract_schema(&self) -> Schema {
        Schema::new(
            self.extract_columns()
                .into_iter()
                .map(|column| Column::new(column, ScalarType::Utf8))
                .collect(),
        )
    }
}

impl fmt::Display for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// One capture: every table it stamps shares the same ingestion instant
#[derive(Debug, Clone, Copy)]
pub struct RawCapture {
    captured_at: NaiveDateTime,
}

impl Default for RawCapture {
    fn default() -> Self {
        Self::at(Utc::now().naive_utc())
    }
}

impl RawCapture {
    pub fn at(captured_at: NaiveDateTime) -> Self {
        Self { captured_at }
    }

    pub fn captured_at(&self) -> NaiveDateTime {
        self.captured_at
    }

    /// Append `ingestion_timestamp` and `source_system` to an extract
    pub fn stamp(&self, source: RawSource, extract: &Table) -> Result<Table> {
        let name = source.table_name();
        for column in [INGESTION_TIMESTAMP, SOURCE_SYSTEM] {
            if extract.schema().index_of(column).is_some() {
                return Err(PipelineError::malformed(
                    name,
                    format!("extract already has reserved column '{}'", column),
                ));
            }
        }
        let rows = extract.num_rows();
        extract
            .with_column(
                name,
                Column::new(INGESTION_TIMESTAMP, ScalarType::Timestamp),
                vec![Value::Timestamp(self.captured_at); rows],
            )?
            .with_column(
                name,
                Column::new(SOURCE_SYSTEM, ScalarType::Utf8),
                vec![Value::from(source.system_label()); rows],
            )
    }

    /// Parse a JSON array-of-objects extract and stamp it.
    ///
    /// An empty array carries no column names, so it takes the source's declared columns.
    pub fn capture_json(&self, source: RawSource, text: &str) -> Result<Table> {
        let extract = table_from_json_str(source.table_name(), text)?;
        let extract = if extract.is_empty() {
            debug!("{} extract has no records; using its declared columns", source);
            Table::empty(source.empty_extract_schema())
        } else {
            extract
        };
        self.stamp(source, &extract)
    }

    /// Read the three extract files and publish the whole raw layer at once
    #[instrument(skip(self, store))]
    pub async fn ingest_files(
        &self,
        store: &dyn TableStore,
        pos: &Path,
        ecommerce: &Path,
        inventory: &Path,
    ) -> Result<Vec<(String, Table)>> {
        let mut tables = Vec::with_capacity(3);
        for (source, path) in RawSource::ALL.into_iter().zip([pos, ecommerce, inventory]) {
            let text = tokio::fs::read_to_string(path).await?;
            let table = self.capture_json(source, &text)?;
            info!("📥 Captured {} rows for {} from {}", table.num_rows(), source, path.display());
            tables.push((source.table_name().to_string(), table));
        }
        store.write_tables(&tables).await?;
        Ok(tables)
    }
}
