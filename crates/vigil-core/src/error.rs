//! Error types for the Vigil capture client.

use thiserror::Error;

/// Result type alias for capture/upload operations.
pub type VigilResult<T> = Result<T, VigilError>;

/// Errors that can occur on the capture, upload, and query paths.
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("browser bridge error: {0}")]
    Bridge(String),

    #[error("frame encode error: {0}")]
    Encode(String),

    #[error("device vault error: {0}")]
    Vault(#[from] sled::Error),

    #[error("backend rejected request with status {status}")]
    Backend { status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
