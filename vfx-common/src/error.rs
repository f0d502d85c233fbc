//! Common error types for the voice effects bot

use thiserror::Error;

/// Common result type for voice effects operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by every voice effects crate
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input received from the chat platform
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
