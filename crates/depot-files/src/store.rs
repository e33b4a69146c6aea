//! Entity store abstraction
//!
//! Records are keyed by `(kind, id)`. The in-memory store backs tests and the
//! default server wiring; persistent backends implement the same trait.

use async_trait::async_trait;
use depot_core::error::DepotResult;
use depot_core::traits::Identifiable;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{FileKind, FileRecord};

/// File entity store
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist a new record, assigning its identifier
    async fn create(&self, record: &mut FileRecord) -> DepotResult<String>;

    /// Fetch a record by kind and identifier
    async fn get(&self, kind: FileKind, id: &str) -> DepotResult<Option<FileRecord>>;

    /// Replace a persisted record
    async fn update(&self, record: &FileRecord) -> DepotResult<()>;

    /// Remove a record. Returns `false` when it was already gone.
    async fn delete(&self, kind: FileKind, id: &str) -> DepotResult<bool>;
}

/// In-memory file store
pub struct MemoryFileStore {
    records: RwLock<Vec<FileRecord>>,
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create(&self, record: &mut FileRecord) -> DepotResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        record.id = Some(id.clone());

        let mut records = self.records.write().await;
        records.push(record.clone());

        Ok(id)
    }

    async fn get(&self, kind: FileKind, id: &str) -> DepotResult<Option<FileRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.kind == kind && r.id.as_deref() == Some(id))
            .cloned())
    }

    async fn update(&self, record: &FileRecord) -> DepotResult<()> {
        let mut records = self.records.write().await;
        if let Some(pos) = records
            .iter()
            .position(|r| r.kind == record.kind && r.id() == record.id())
        {
            records[pos] = record.clone();
        }
        Ok(())
    }

    async fn delete(&self, kind: FileKind, id: &str) -> DepotResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(r.kind == kind && r.id.as_deref() == Some(id)));
        Ok(records.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FileRecord {
        FileRecord::new(
            FileKind::Image,
            "image/ab/cd/0123456789abcdef.jpg",
            "photo.jpg",
            "image/jpeg",
            64,
        )
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = MemoryFileStore::new();
        let mut rec = record();

        let id = store.create(&mut rec).await.unwrap();
        assert_eq!(rec.id.as_deref(), Some(id.as_str()));
        assert_eq!(id.len(), 32);
    }

    #[tokio::test]
    async fn test_get_is_kind_scoped() {
        let store = MemoryFileStore::new();
        let mut rec = record();
        let id = store.create(&mut rec).await.unwrap();

        assert!(store.get(FileKind::Image, &id).await.unwrap().is_some());
        assert!(store.get(FileKind::Generic, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces() {
        let store = MemoryFileStore::new();
        let mut rec = record();
        let id = store.create(&mut rec).await.unwrap();

        rec.description = Some("updated".to_string());
        store.update(&rec).await.unwrap();

        let fetched = store.get(FileKind::Image, &id).await.unwrap().unwrap();
        assert_eq!(fetched.description.as_deref(), Some("updated"));
    }

    #[tokio::test]
    async fn test_double_delete_is_benign() {
        let store = MemoryFileStore::new();
        let mut rec = record();
        let id = store.create(&mut rec).await.unwrap();

        assert!(store.delete(FileKind::Image, &id).await.unwrap());
        assert!(!store.delete(FileKind::Image, &id).await.unwrap());
    }
}
