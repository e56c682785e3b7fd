//! Custom error types for the backup rotator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required tool unavailable: {0}")]
    ToolMissing(String),

    #[error("Archive creation failed: {0}")]
    Archive(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Remote listing failed: {0}")]
    Listing(String),

    #[error("Remote deletion failed: {0}")]
    Deletion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RotatorError>;
