//! Scratch directory for downloaded and generated audio
//!
//! One flat directory, emptied at startup. Every upload and every transform
//! output gets a fresh name, so a new upload never overwrites a file that a
//! running job still reads. Clone samples keep one deterministic name per user.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;
use vfx_common::UserId;

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Create the directory if needed and remove anything left from a previous run
    pub async fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let mut removed = 0usize;
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
            }
        }

        info!("Scratch directory ready: {} ({} stale entries removed)", root.display(), removed);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unique path for one upload of a user
    pub fn fresh_input_path(&self, user_id: UserId) -> PathBuf {
        self.root.join(format!("input_{}_{}.ogg", user_id, short_suffix()))
    }

    /// Recorded clone sample of a user
    pub fn clone_sample_path(&self, user_id: UserId) -> PathBuf {
        self.root.join(format!("cloned_voice_{}.ogg", user_id))
    }

    /// Unique output path for one transform job
    pub fn fresh_output_path(&self, user_id: UserId) -> PathBuf {
        self.root.join(format!("output_{}_{}.ogg", user_id, short_suffix()))
    }
}

/// First 8 hex digits of a random UUID
fn short_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_creates_missing_dir() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("temp_audio");

        let scratch = ScratchDir::prepare(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(scratch.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_prepare_clears_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("input_1.ogg"), b"old").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("x.ogg"), b"old").unwrap();

        ScratchDir::prepare(dir.path()).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::prepare(dir.path()).await.unwrap();

        assert_eq!(scratch.clone_sample_path(42), dir.path().join("cloned_voice_42.ogg"));

        for (a, b, prefix) in [
            (scratch.fresh_input_path(42), scratch.fresh_input_path(42), "input_42_"),
            (scratch.fresh_output_path(42), scratch.fresh_output_path(42), "output_42_"),
        ] {
            assert_ne!(a, b);
            assert_eq!(a.parent(), Some(dir.path()));
            let name = a.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(prefix), "{}", name);
            assert!(name.ends_with(".ogg"));
            assert_eq!(name.len(), prefix.len() + 8 + ".ogg".len());
        }
    }

    #[tokio::test]
    async fn test_prepare_fails_on_file_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ScratchDir::prepare(file.path()).await.is_err());
    }
}
