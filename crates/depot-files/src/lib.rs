//! # depot-files
//!
//! File entity handling for Depot RS.
//!
//! ## Features
//!
//! - Tagged generic/image file entities with an image-only attribute set
//! - Collision-avoiding, MIME-partitioned storage path allocation
//! - One-time ingestion normalization (EXIF capture, orientation fix,
//!   legacy-bitmap conversion)
//! - Explicit computed-field table with write guards
//! - Deletion cascade removing the backing bytes
//!
//! ## Example
//!
//! ```rust,ignore
//! use depot_core::config::DepotConfig;
//! use depot_files::{FileService, MemoryFileStore};
//! use std::sync::Arc;
//!
//! let service = FileService::new(Arc::new(MemoryFileStore::new()), DepotConfig::default());
//!
//! // Ingest an upload
//! let record = service
//!     .create(bytes::Bytes::from(data), "image/jpeg", "photo.jpg", None, None)
//!     .await?;
//! ```

pub mod allocator;
pub mod fields;
pub mod model;
pub mod service;
pub mod store;

mod normalize;

pub use allocator::allocate;
pub use fields::{FieldContext, FieldOptions};
pub use model::{FileKind, FileRecord, FileRef, ImageAttrs};
pub use service::FileService;
pub use store::{FileStore, MemoryFileStore};
