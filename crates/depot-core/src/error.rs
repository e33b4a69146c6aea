//! Core error taxonomy for Depot RS
//!
//! Every fallible operation in the workspace funnels into `DepotError`.

use thiserror::Error;

/// Core error type for all Depot operations
#[derive(Error, Debug)]
pub enum DepotError {
    /// The referenced file entity (or its on-disk source) does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A file reference did not parse as `{kind}:{id}`.
    #[error("invalid file identifier: {0}")]
    InvalidIdentifier(String),

    /// Width or height arguments were negative or unparseable.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// An attempt was made to overwrite a derived, read-only field.
    #[error("field '{0}' cannot be changed")]
    ImmutableField(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decode/encode failures from the image codec. Not retried.
    #[error("image codec error: {0}")]
    Image(String),
}

pub type DepotResult<T> = Result<T, DepotError>;

/// HTTP status code mapping for errors
impl DepotError {
    pub fn status_code(&self) -> u16 {
        match self {
            DepotError::NotFound(_) => 404,
            DepotError::InvalidIdentifier(_) => 400,
            DepotError::InvalidDimensions(_) => 400,
            DepotError::ImmutableField(_) => 422,
            DepotError::Io(_) | DepotError::Image(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DepotError::NotFound(_) => "not_found",
            DepotError::InvalidIdentifier(_) => "invalid_identifier",
            DepotError::InvalidDimensions(_) => "invalid_dimensions",
            DepotError::ImmutableField(_) => "immutable_field",
            DepotError::Io(_) => "io_error",
            DepotError::Image(_) => "image_error",
        }
    }
}
