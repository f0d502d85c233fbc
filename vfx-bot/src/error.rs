//! Error types for vfx-bot

use thiserror::Error;

/// Main error type for the bot service
#[derive(Error, Debug)]
pub enum Error {
    /// Bot API rejected a call
    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// Network or HTTP-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] vfx_common::Error),
}

/// Convenience Result type using the bot Error
pub type Result<T> = std::result::Result<T, Error>;
