//! Protocol error types

use thiserror::Error;

/// Errors raised while decoding or encoding frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame text was not valid JSON
    #[error("Invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}
