//! Table store port and its implementations.
//!
//! Every stage reads whole tables from a store and publishes whole tables back.
//! A reader never observes a partially written table.

pub mod fs;
pub mod in_memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::table::Table;

pub use fs::FsTableStore;
pub use in_memory::InMemoryTableStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table '{0}' not found")]
    NotFound(String),

    #[error("invalid table name '{0}'")]
    InvalidName(String),

    #[error("I/O error on table '{table}': {source}")]
    Io {
        table: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot (de)serialize table '{table}': {source}")]
    Json {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage port for named, immutable table snapshots
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Read a table; `StoreError::NotFound` when absent
    async fn read_table(&self, name: &str) -> Result<Table, StoreError>;

    /// Replace the table stored under `name`
    async fn write_table(&self, name: &str, table: &Table) -> Result<(), StoreError>;

    /// Publish several tables as one unit
    async fn write_tables(&self, tables: &[(String, Table)]) -> Result<(), StoreError> {
        for (name, table) in tables {
            self.write_table(name, table).await?;
        }
        Ok(())
    }

    /// Names of all stored tables, sorted
    async fn list_tables(&self) -> Result<Vec<String>, StoreError>;
}

/// Table names are used as file stems, so keep them to a safe alphabet
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("sales_unified").is_ok());
        assert!(validate_name("dim_product2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("Sales").is_err());
    }
}
