//! Computed fields and write guards
//!
//! The dynamic per-field interception of the source system becomes an
//! explicit table here: computed fields are pure functions
//! `(record, context, options) -> value` evaluated on read, and a parallel
//! guard list rejects writes to derived fields unconditionally.

use std::path::Path;

use depot_core::align::align;
use depot_core::config::DepotConfig;
use depot_core::error::{DepotError, DepotResult};

use crate::model::FileRecord;

/// Call-time options for computed-field evaluation
#[derive(Debug, Clone, Copy)]
pub struct FieldOptions {
    /// Requested variant width; 0 means unconstrained
    pub width: i64,
    /// Requested variant height; 0 means unconstrained
    pub height: i64,
    /// When false, a requested side never exceeds the original raster
    pub enlarge: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            enlarge: true,
        }
    }
}

impl FieldOptions {
    pub fn sized(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

/// Evaluation context for computed fields
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub config: &'a DepotConfig,
}

/// A computed field: pure function of the record, context, and options.
/// `Ok(None)` means the field is not defined for this record's kind.
pub type ComputedFn = fn(&FileRecord, &FieldContext, &FieldOptions) -> DepotResult<Option<String>>;

/// Computed fields, evaluated on read
pub const COMPUTED_FIELDS: &[(&str, ComputedFn)] = &[
    ("storage_path", storage_path),
    ("url", url),
    ("thumb_url", thumb_url),
];

/// Fields whose writes are rejected unconditionally
pub const WRITE_GUARDED_FIELDS: &[&str] = &["storage_path"];

/// Evaluate a computed field by name
pub fn get(
    record: &FileRecord,
    ctx: &FieldContext,
    field: &str,
    opts: &FieldOptions,
) -> DepotResult<Option<String>> {
    match COMPUTED_FIELDS.iter().find(|(name, _)| *name == field) {
        Some((_, f)) => f(record, ctx, opts),
        None => Ok(None),
    }
}

/// Apply a named write to a record.
///
/// Guarded fields error, unknown fields return `Ok(false)`, applied writes
/// return `Ok(true)`.
pub fn set(record: &mut FileRecord, field: &str, value: String) -> DepotResult<bool> {
    if let Some(guarded) = WRITE_GUARDED_FIELDS.iter().find(|g| **g == field) {
        return Err(DepotError::ImmutableField(*guarded));
    }

    match field {
        "name" => {
            record.name = value;
            Ok(true)
        }
        "description" => {
            record.description = Some(value);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Absolute filesystem location of the stored bytes
fn storage_path(
    record: &FileRecord,
    ctx: &FieldContext,
    _opts: &FieldOptions,
) -> DepotResult<Option<String>> {
    let path = ctx.config.paths.storage_root.join(&record.path);
    Ok(Some(path.to_string_lossy().into_owned()))
}

/// Public resize-route URL for an image record
///
/// Both requested sides are grid-aligned here so that every URL handed out is
/// already a fixed point of the alignment rule.
fn url(record: &FileRecord, ctx: &FieldContext, opts: &FieldOptions) -> DepotResult<Option<String>> {
    if record.image().is_none() {
        return Ok(None);
    }

    let id = record
        .id
        .as_deref()
        .ok_or_else(|| DepotError::InvalidIdentifier("unsaved record has no URL".to_string()))?;
    if id.len() < 4 {
        return Err(DepotError::InvalidIdentifier(id.to_string()));
    }

    let width = aligned_side(
        opts.width,
        opts.enlarge,
        record.image().map(|a| a.width).unwrap_or(0),
        ctx.config.images.resize_limit_width,
        ctx.config.images.resize_step,
    )?;
    let height = aligned_side(
        opts.height,
        opts.enlarge,
        record.image().map(|a| a.height).unwrap_or(0),
        ctx.config.images.resize_limit_height,
        ctx.config.images.resize_step,
    )?;

    let extension = Path::new(&record.path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    Ok(Some(format!(
        "/image/resize/{}/{}/{}/{}/{}{}",
        width,
        height,
        &id[0..2],
        &id[2..4],
        id,
        extension
    )))
}

/// Thumbnail URL: the resize URL at 450x450 unless sized explicitly
fn thumb_url(
    record: &FileRecord,
    ctx: &FieldContext,
    opts: &FieldOptions,
) -> DepotResult<Option<String>> {
    let opts = FieldOptions {
        width: if opts.width > 0 { opts.width } else { 450 },
        height: if opts.height > 0 { opts.height } else { 450 },
        enlarge: opts.enlarge,
    };
    url(record, ctx, &opts)
}

fn aligned_side(
    requested: i64,
    enlarge: bool,
    original: u32,
    max_value: u32,
    step: u32,
) -> DepotResult<u32> {
    if requested < 0 {
        return Err(DepotError::InvalidDimensions(format!(
            "width and height must be non-negative, got {}",
            requested
        )));
    }

    if requested == 0 {
        return Ok(0);
    }

    let mut requested = requested;
    // "Do not enlarge" clamps straight to the original raster size.
    if !enlarge && requested > original as i64 {
        requested = original as i64;
    }

    Ok(align(requested, max_value, step))
}
