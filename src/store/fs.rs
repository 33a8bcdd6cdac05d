use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{validate_name, StoreError, TableStore};
use crate::table::Table;

/// Filesystem table store: one JSON snapshot per table under `root`.
///
/// Writes go to a hidden temp file in the same directory and are moved into place
/// with `rename`, so readers see either the old or the new snapshot. A batch that
/// fails partway through is rolled back to the snapshots it replaced.
#[derive(Debug, Clone)]
pub struct FsTableStore {
    root: PathBuf,
}

impl FsTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    fn io_err(table: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            table: table.to_string(),
            source,
        }
    }

    /// Serialize `table` into a temp file next to its final path
    async fn stage(&self, name: &str, table: &Table) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        let bytes = serde_json::to_vec(table).map_err(|source| StoreError::Json {
            table: name.to_string(),
            source,
        })?;
        self.stage_bytes(name, &bytes).await
    }

    async fn stage_bytes(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_err(name, e))?;
        let tmp = self.root.join(format!(".{}.json.tmp-{}", name, Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| Self::io_err(name, e))?;
        Ok(tmp)
    }

    /// Bytes currently published under `name`, if any
    async fn snapshot(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(name, e)),
        }
    }

    /// Move a staged file over `name`, remembering what it replaced
    async fn swap_in(&self, name: &str, tmp: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        let previous = self.snapshot(name).await?;
        tokio::fs::rename(tmp, self.path_for(name))
            .await
            .map_err(|e| Self::io_err(name, e))?;
        Ok(previous)
    }

    /// Put back what each published table replaced, newest first
    async fn roll_back(&self, published: Vec<(&str, Option<Vec<u8>>)>) {
        for (name, previous) in published.into_iter().rev() {
            let restored = match previous {
                Some(bytes) => match self.stage_bytes(name, &bytes).await {
                    Ok(tmp) => {
                        let renamed = tokio::fs::rename(&tmp, self.path_for(name)).await;
                        if renamed.is_err() {
                            Self::discard(&[tmp]).await;
                        }
                        renamed.map_err(|e| Self::io_err(name, e))
                    }
                    Err(e) => Err(e),
                },
                None => tokio::fs::remove_file(self.path_for(name))
                    .await
                    .map_err(|e| Self::io_err(name, e)),
            };
            if let Err(e) = restored {
                warn!("Failed to roll back table {}: {}", name, e);
            }
        }
    }

    async fn discard(staged: &[PathBuf]) {
        for tmp in staged {
            if let Err(e) = tokio::fs::remove_file(tmp).await {
                warn!("Failed to remove staged file {}: {}", tmp.display(), e);
            }
        }
    }
}

#[async_trait]
impl TableStore for FsTableStore {
    async fn read_table(&self, name: &str) -> Result<Table, StoreError> {
        validate_name(name)?;
        let path = self.path_for(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(Self::io_err(name, e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            table: name.to_string(),
            source,
        })
    }

    async fn write_table(&self, name: &str, table: &Table) -> Result<(), StoreError> {
        let tmp = self.stage(name, table).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(name)).await {
            Self::discard(&[tmp]).await;
            return Err(Self::io_err(name, e));
        }
        debug!("Wrote table {} ({} rows) to {}", name, table.num_rows(), self.root.display());
        Ok(())
    }

    async fn write_tables(&self, tables: &[(String, Table)]) -> Result<(), StoreError> {
        // Stage everything first; nothing is published unless every table serialized
        let mut staged = Vec::with_capacity(tables.len());
        for (name, table) in tables {
            match self.stage(name, table).await {
                Ok(tmp) => staged.push(tmp),
                Err(e) => {
                    Self::discard(&staged).await;
                    return Err(e);
                }
            }
        }

        // A failed swap puts every earlier table of the batch back the way it was
        let mut published = Vec::with_capacity(tables.len());
        for (i, ((name, _), tmp)) in tables.iter().zip(&staged).enumerate() {
            match self.swap_in(name, tmp).await {
                Ok(previous) => published.push((name.as_str(), previous)),
                Err(e) => {
                    Self::discard(&staged[i..]).await;
                    self.roll_back(published).await;
                    return Err(e);
                }
            }
        }
        debug!("Published {} tables to {}", tables.len(), self.root.display());
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(Self::io_err("*", e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::io_err("*", e))? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(stem) = file_name.strip_suffix(".json") {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ScalarType, Schema, Value};
    use tempfile::tempdir;

    fn sample() -> Table {
        Table::new(
            "sample",
            Schema::of(&[("id", ScalarType::Utf8), ("price", ScalarType::Decimal)]),
            vec![vec![Value::from("P1"), Value::Decimal(rust_decimal::Decimal::new(1999, 2))]],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let store = FsTableStore::new(dir.path().join("conformed"));
        store.write_table("sales_unified", &sample()).await.unwrap();

        let back = store.read_table("sales_unified").await.unwrap();
        assert_eq!(back, sample());
        assert_eq!(store.list_tables().await.unwrap(), vec!["sales_unified".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FsTableStore::new(dir.path());
        let err = store.read_table("fact_sales").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_batch_publishes_nothing() {
        let dir = tempdir().unwrap();
        let store = FsTableStore::new(dir.path());
        let batch = vec![
            ("dim_product".to_string(), sample()),
            ("not valid".to_string(), sample()),
        ];
        assert!(store.write_tables(&batch).await.is_err());
        assert!(store.list_tables().await.unwrap().is_empty());

        // no staged temp files left behind
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".tmp-"))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_rename_rolls_back_earlier_tables() {
        let dir = tempdir().unwrap();
        let store = FsTableStore::new(dir.path());
        let previous = Table::empty(sample().schema().clone());
        store.write_table("dim_product", &previous).await.unwrap();

        // a directory in place of the second table makes its swap fail
        std::fs::create_dir(dir.path().join("fact_sales.json")).unwrap();
        let batch = vec![
            ("dim_product".to_string(), sample()),
            ("dim_location".to_string(), sample()),
            ("fact_sales".to_string(), sample()),
        ];
        assert!(store.write_tables(&batch).await.is_err());

        assert_eq!(store.read_table("dim_product").await.unwrap(), previous);
        assert!(matches!(
            store.read_table("dim_location").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(temp_files(dir.path()).is_empty());
    }
}
