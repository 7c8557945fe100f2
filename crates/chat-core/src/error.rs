//! Error types for gateway and extraction operations.

use thiserror::Error;

/// Errors that can occur when calling a generation backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error (missing API key, bad URL, etc.)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network-level failure (connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The backend returned an error or an unusable response.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

/// Errors that can occur while extracting text from an uploaded file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file was read but produced no usable text.
    #[error("no text could be extracted")]
    Empty,
}
