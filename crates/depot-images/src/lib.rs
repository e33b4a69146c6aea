//! # depot-images
//!
//! On-demand image variant handling for Depot RS:
//!
//! - Canonicalizing requested sizes onto the alignment grid
//! - Deterministic center-crop-then-resize variant generation with a
//!   filesystem cache
//! - Time-based sweeping of obsolete variants

pub mod sweep;
pub mod variant;

pub use depot_core::align::align;
pub use sweep::{sweep, SweepReport};
pub use variant::{ResizeOutcome, VariantResolver};
