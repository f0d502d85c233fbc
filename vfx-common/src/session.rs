//! Per-user session store
//!
//! One session per user, created lazily on first access and kept for the
//! lifetime of the process. Nothing is persisted.
//!
//! The map itself sits behind a `RwLock`; every session has its own `Mutex`,
//! so updates for different users never wait on each other and each update
//! closure runs atomically for its user.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Chat platform user identifier
pub type UserId = i64;

/// Display name used when the user skips naming their cloned voice
pub const DEFAULT_VOICE_NAME: &str = "My Voice";

/// How the next inbound message from a user is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingMode {
    #[default]
    Idle,
    AwaitingCloneSample,
    AwaitingCloneName,
}

/// Transient per-user state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    /// Source audio for the next effect
    pub uploaded_audio_path: Option<PathBuf>,
    /// Zero-based menu page
    pub current_page: usize,
    /// Recorded voice sample
    pub cloned_sample_path: Option<PathBuf>,
    /// Label of the cloned voice in the menu
    pub cloned_display_name: Option<String>,
    pub pending_mode: PendingMode,
}

impl UserSession {
    pub fn has_cloned_voice(&self) -> bool {
        self.cloned_sample_path.is_some()
    }

    /// Store a voice sample, naming it by default if still unnamed
    pub fn record_clone_sample(&mut self, path: PathBuf) {
        self.cloned_sample_path = Some(path);
        if self.cloned_display_name.is_none() {
            self.cloned_display_name = Some(DEFAULT_VOICE_NAME.to_string());
        }
    }

    /// Cloned voice label, falling back to the default name
    pub fn display_name(&self) -> &str {
        self.cloned_display_name.as_deref().unwrap_or(DEFAULT_VOICE_NAME)
    }
}

/// Concurrency-safe map of user sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Arc<Mutex<UserSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session handle for `user_id`, created on first access
    async fn entry(&self, user_id: UserId) -> Arc<Mutex<UserSession>> {
        if let Some(session) = self.sessions.read().await.get(&user_id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(user_id).or_insert_with(|| {
            tracing::debug!(user_id, "Creating session");
            Arc::new(Mutex::new(UserSession::default()))
        }))
    }

    /// Snapshot of the user's session (created with defaults if absent)
    pub async fn get_or_create(&self, user_id: UserId) -> UserSession {
        self.entry(user_id).await.lock().await.clone()
    }

    /// Run `f` with exclusive access to the user's session
    pub async fn update<F, R>(&self, user_id: UserId, f: F) -> R
    where
        F: FnOnce(&mut UserSession) -> R,
    {
        let session = self.entry(user_id).await;
        let mut guard = session.lock().await;
        f(&mut guard)
    }

    /// Store a new upload, returning the one it replaced
    ///
    /// A fresh upload always restarts pagination.
    pub async fn set_uploaded_audio(&self, user_id: UserId, path: PathBuf) -> Option<PathBuf> {
        self.update(user_id, |s| {
            s.current_page = 0;
            s.uploaded_audio_path.replace(path)
        })
        .await
    }

    /// Forget the upload, returning the path that was stored
    pub async fn clear_uploaded_audio(&self, user_id: UserId) -> Option<PathBuf> {
        self.update(user_id, |s| s.uploaded_audio_path.take()).await
    }

    /// Store a recorded voice sample, naming it by default if still unnamed
    pub async fn set_cloned_sample(&self, user_id: UserId, path: PathBuf) {
        self.update(user_id, |s| s.record_clone_sample(path)).await
    }

    /// Number of sessions created since startup
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_defaults() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let session = store.get_or_create(42).await;
        assert_eq!(session, UserSession::default());
        assert_eq!(session.pending_mode, PendingMode::Idle);
        assert_eq!(store.len().await, 1);

        // Second access reuses the session
        store.get_or_create(42).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_resets_page() {
        let store = SessionStore::new();
        store.update(7, |s| s.current_page = 5).await;

        assert_eq!(store.set_uploaded_audio(7, PathBuf::from("/tmp/input_7_a.ogg")).await, None);
        assert_eq!(
            store.set_uploaded_audio(7, PathBuf::from("/tmp/input_7.ogg")).await,
            Some(PathBuf::from("/tmp/input_7_a.ogg"))
        );

        let session = store.get_or_create(7).await;
        assert_eq!(session.current_page, 0);
        assert_eq!(session.uploaded_audio_path, Some(PathBuf::from("/tmp/input_7.ogg")));
    }

    #[tokio::test]
    async fn test_cloned_sample_keeps_existing_name() {
        let store = SessionStore::new();

        store.set_cloned_sample(1, PathBuf::from("a.ogg")).await;
        assert_eq!(store.get_or_create(1).await.display_name(), DEFAULT_VOICE_NAME);

        store.update(1, |s| s.cloned_display_name = Some("Robot Me".to_string())).await;
        store.set_cloned_sample(1, PathBuf::from("b.ogg")).await;

        let session = store.get_or_create(1).await;
        assert_eq!(session.display_name(), "Robot Me");
        assert_eq!(session.cloned_sample_path, Some(PathBuf::from("b.ogg")));
    }

    #[tokio::test]
    async fn test_clear_uploaded_audio() {
        let store = SessionStore::new();
        assert_eq!(store.clear_uploaded_audio(3).await, None);

        store.set_uploaded_audio(3, PathBuf::from("in.ogg")).await;
        assert_eq!(store.clear_uploaded_audio(3).await, Some(PathBuf::from("in.ogg")));
        assert!(store.get_or_create(3).await.uploaded_audio_path.is_none());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = Arc::new(SessionStore::new());

        let mut handles = Vec::new();
        for user in 0..16i64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for page in 0..50usize {
                    store.update(user, |s| s.current_page = page).await;
                }
                store
                    .set_uploaded_audio(user, PathBuf::from(format!("input_{}.ogg", user)))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await, 16);
        for user in 0..16i64 {
            let session = store.get_or_create(user).await;
            assert_eq!(session.current_page, 0);
            assert_eq!(
                session.uploaded_audio_path,
                Some(PathBuf::from(format!("input_{}.ogg", user)))
            );
        }
    }
}
