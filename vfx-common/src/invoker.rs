//! Media transform invoker contract
//!
//! The core hands `(input, transform, output)` to an implementation of
//! [`TransformInvoker`] and only looks at success or failure.

use crate::catalog::TransformSpec;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Transform failures
#[derive(Debug, Error)]
pub enum TransformError {
    /// Source audio is missing on disk
    #[error("Input file not found: {0}")]
    InputMissing(PathBuf),

    /// Tool could not be started
    #[error("Failed to start media tool: {0}")]
    Spawn(String),

    /// Tool exited unsuccessfully
    #[error("Media tool failed (exit code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// Tool did not finish in time and was killed
    #[error("Media tool timed out after {0:?}")]
    Timeout(Duration),
}

/// Runs an opaque transform on an audio file
#[async_trait]
pub trait TransformInvoker: Send + Sync {
    /// Transform `input` into `output`
    async fn invoke(
        &self,
        input: &Path,
        transform: &TransformSpec,
        output: &Path,
    ) -> Result<(), TransformError>;
}
