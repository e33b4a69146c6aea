//! File service
//!
//! Orchestrates ingestion, lookup, field updates, and the deletion cascade.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use depot_core::config::DepotConfig;
use depot_core::error::{DepotError, DepotResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::allocator;
use crate::fields;
use crate::model::{FileKind, FileRecord, FileRef};
use crate::normalize;
use crate::store::FileStore;

/// Raster formats stored as image entities
static IMAGE_MIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^image/(bmp|gif|jpeg|jp2|jpx|jpm|tiff|x-icon|png)$").expect("valid regex"));

/// File service
pub struct FileService {
    store: Arc<dyn FileStore>,
    config: DepotConfig,
}

impl FileService {
    pub fn new(store: Arc<dyn FileStore>, config: DepotConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DepotConfig {
        &self.config
    }

    fn storage_root(&self) -> &Path {
        &self.config.paths.storage_root
    }

    /// Ingest uploaded bytes as a new file entity.
    ///
    /// Allocates a collision-free storage path (honoring a well-formed
    /// proposed path), writes the bytes, and for raster images runs the
    /// one-time normalization before the record is first persisted.
    #[instrument(skip(self, data, description), fields(name = %name, mime = %mime))]
    pub async fn create(
        &self,
        data: Bytes,
        mime: &str,
        name: &str,
        description: Option<&str>,
        propose_path: Option<&str>,
    ) -> DepotResult<FileRecord> {
        let mut name = name.to_string();
        if Path::new(&name).extension().is_none() {
            if let Some(ext) = mime_guess::get_mime_extensions_str(mime).and_then(|e| e.first()) {
                name = format!("{}.{}", name, ext);
            }
        }

        let relative = allocator::allocate(self.storage_root(), &name, mime, propose_path);
        let abs = self.storage_root().join(&relative);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&abs, &data).await?;

        let kind = if IMAGE_MIME.is_match(mime) {
            FileKind::Image
        } else {
            FileKind::Generic
        };

        let mut record = FileRecord::new(kind, relative, name, mime, data.len() as u64);
        if let Some(description) = description {
            record = record.with_description(description);
        }

        if kind == FileKind::Image {
            normalize::normalize(&mut record, self.storage_root())?;
        }

        let id = self.store.create(&mut record).await?;
        info!(id = %id, path = %record.path, "file entity created");

        Ok(record)
    }

    /// Resolve a `{kind}:{id}` reference to its record
    pub async fn get(&self, uid: &str) -> DepotResult<FileRecord> {
        let fref: FileRef = uid.parse()?;
        self.store
            .get(fref.kind, &fref.id)
            .await?
            .ok_or_else(|| DepotError::NotFound(uid.to_string()))
    }

    /// Apply named-field writes to a record.
    ///
    /// Derived fields are rejected through the write-guard table; unknown
    /// fields are skipped with a warning. Normalization never re-runs here.
    pub async fn update<I>(&self, uid: &str, updates: I) -> DepotResult<FileRecord>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut record = self.get(uid).await?;

        for (field, value) in updates {
            if !fields::set(&mut record, &field, value)? {
                warn!(field = %field, "ignoring write to unknown field");
            }
        }

        self.store.update(&record).await?;
        Ok(record)
    }

    /// Remove a file entity and its backing bytes.
    ///
    /// Racing deleters are tolerated: a reference to an already-removed
    /// entity, or already-removed bytes, is a benign no-op.
    #[instrument(skip(self))]
    pub async fn delete(&self, uid: &str) -> DepotResult<()> {
        let fref: FileRef = uid.parse()?;

        let record = match self.store.get(fref.kind, &fref.id).await? {
            Some(record) => record,
            None => {
                debug!(uid = %uid, "entity already removed");
                return Ok(());
            }
        };

        if !self.store.delete(fref.kind, &fref.id).await? {
            debug!(uid = %uid, "entity removed by a concurrent deleter");
        }

        let abs = self.storage_root().join(&record.path);
        if abs.exists() {
            fs::remove_file(&abs).await?;
        }

        info!(uid = %uid, path = %record.path, "file entity deleted");
        Ok(())
    }
}
