//! Error types produced by the `report` crate.
//!
//! [`ParseError`] is the only fatal surface: it is returned when the request
//! body cannot be interpreted as structured data at all. Missing or invalid
//! fields within valid structure are never fatal; they become diagnostics on
//! the produced record instead.
use thiserror::Error;

/// Fatal parse failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unsupported report shape: expected a json object or array")]
    UnsupportedShape,
}
