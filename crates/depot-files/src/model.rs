//! File entity model
//!
//! One record per stored file. The generic/image split is a tagged variant
//! with an image-only attribute set, dispatched via a capability check.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use depot_core::error::DepotError;
use depot_core::traits::{Identifiable, Timestamped};
use serde::{Deserialize, Serialize};

/// Entity kinds, serialized as their collection names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Generic,
    Image,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "file",
            Self::Image => "file_image",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::Generic),
            "file_image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image-only attributes, captured once at ingestion
///
/// Width and height always reflect the currently stored raster, including
/// after orientation correction or format conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub width: u32,
    pub height: u32,
    /// Extracted metadata, tag name -> display value
    pub exif: BTreeMap<String, String>,
}

/// A stored file entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Opaque identifier, assigned by the store at creation
    pub id: Option<String>,
    pub kind: FileKind,
    /// Relative, MIME-partitioned storage path: `{category}/{2ch}/{2ch}/{16ch}{ext}`.
    /// Retargeted only by ingestion-time format conversion, immutable afterwards.
    pub path: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    pub mime: String,
    /// Byte length at ingestion
    pub length: u64,
    /// Present iff `kind == FileKind::Image`
    pub image: Option<ImageAttrs>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        kind: FileKind,
        path: impl Into<String>,
        name: impl Into<String>,
        mime: impl Into<String>,
        length: u64,
    ) -> Self {
        Self {
            id: None,
            kind,
            path: path.into(),
            name: name.into(),
            description: None,
            mime: mime.into(),
            length,
            image: match kind {
                FileKind::Image => Some(ImageAttrs::default()),
                FileKind::Generic => None,
            },
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Capability check: image-only attributes, if this is an image
    pub fn image(&self) -> Option<&ImageAttrs> {
        self.image.as_ref()
    }

    pub fn image_mut(&mut self) -> Option<&mut ImageAttrs> {
        self.image.as_mut()
    }

    pub fn is_image(&self) -> bool {
        self.image.is_some()
    }

    /// File extension of the stored path, without the dot
    pub fn extension(&self) -> Option<&str> {
        if !self.path.contains('.') {
            return None;
        }
        self.path
            .rsplit('.')
            .next()
            .filter(|ext| !ext.is_empty() && ext.len() <= 10)
    }

    /// The `{kind}:{id}` reference for a persisted record
    pub fn uid(&self) -> Option<String> {
        self.id
            .as_deref()
            .map(|id| format!("{}:{}", self.kind, id))
    }

    /// Re-point the record at a new stored representation. Only ingestion-time
    /// format conversion is allowed to do this.
    pub(crate) fn retarget(&mut self, path: impl Into<String>, mime: impl Into<String>) {
        self.path = path.into();
        self.mime = mime.into();
    }
}

impl Identifiable for FileRecord {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Timestamped for FileRecord {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A parsed `{kind}:{id}` file reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub kind: FileKind,
    pub id: String,
}

impl FromStr for FileRef {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');
        let kind = parts
            .next()
            .and_then(FileKind::from_str)
            .ok_or_else(|| DepotError::InvalidIdentifier(s.to_string()))?;
        let id = parts
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DepotError::InvalidIdentifier(s.to_string()))?;

        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
