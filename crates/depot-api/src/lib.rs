//! # depot-api
//!
//! HTTP handlers and routes for Depot RS.
//!
//! The public surface is the image resize endpoint; every terminal outcome
//! is a permanent redirect (canonical aligned URL, placeholder, or the
//! generated variant's public URL).

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
