use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{validate_name, StoreError, TableStore};
use crate::table::Table;

/// In-memory table store for development/testing
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Table>> {
        // A poisoned lock still holds whole tables; no partial writes are possible
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn read_table(&self, name: &str) -> Result<Table, StoreError> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn write_table(&self, name: &str, table: &Table) -> Result<(), StoreError> {
        validate_name(name)?;
        self.lock().insert(name.to_string(), table.clone());
        debug!("Stored table {} ({} rows)", name, table.num_rows());
        Ok(())
    }

    async fn write_tables(&self, tables: &[(String, Table)]) -> Result<(), StoreError> {
        for (name, _) in tables {
            validate_name(name)?;
        }
        let mut guard = self.lock();
        for (name, table) in tables {
            guard.insert(name.clone(), table.clone());
        }
        debug!("Stored {} tables in one batch", tables.len());
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ScalarType, Schema};

    #[tokio::test]
    async fn test_read_missing_table() {
        let store = InMemoryTableStore::new();
        let err = store.read_table("dim_product").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref n) if n == "dim_product"));
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let store = InMemoryTableStore::new();
        let empty = Table::empty(Schema::of(&[("a", ScalarType::Utf8)]));
        let other = Table::empty(Schema::of(&[("b", ScalarType::Int64)]));
        store.write_table("t", &empty).await.unwrap();
        store.write_table("t", &other).await.unwrap();
        assert_eq!(store.read_table("t").await.unwrap(), other);
        assert_eq!(store.list_tables().await.unwrap(), vec!["t".to_string()]);
    }

    #[tokio::test]
    async fn test_batch_with_bad_name_writes_nothing() {
        let store = InMemoryTableStore::new();
        let table = Table::empty(Schema::of(&[("a", ScalarType::Utf8)]));
        let batch = vec![("good".to_string(), table.clone()), ("Bad Name".to_string(), table)];
        assert!(store.write_tables(&batch).await.is_err());
        assert!(store.list_tables().await.unwrap().is_empty());
    }
}
