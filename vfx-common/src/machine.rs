//! Session state machine
//!
//! Three flat states: `Idle`, `AwaitingCloneSample` and `AwaitingCloneName`.
//! The only multi-step conversation is recording a voice sample and naming
//! it; effect application is stateless request/response on top of the
//! stored upload (see [`crate::dispatch`]).
//!
//! Inbound media is handled in two phases. [`SessionMachine::route_media`]
//! validates against the current mode without touching state, so rejected
//! media is never downloaded. Once the transport has saved the file,
//! [`SessionMachine::accept_upload`] or [`SessionMachine::accept_clone_sample`]
//! commits the transition.

use crate::rejection::Rejection;
use crate::session::{PendingMode, SessionStore, UserId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Shortest accepted clone sample (inclusive)
pub const CLONE_SAMPLE_MIN: Duration = Duration::from_secs(3);

/// Longest accepted clone sample (inclusive)
pub const CLONE_SAMPLE_MAX: Duration = Duration::from_secs(30);

/// Longest accepted effect upload (inclusive)
pub const UPLOAD_MAX: Duration = Duration::from_secs(60);

/// Maximum characters in a cloned voice name
pub const MAX_VOICE_NAME_CHARS: usize = 20;

/// Kind of inbound media message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Recorded voice note
    Voice,
    /// Uploaded audio file
    AudioFile,
}

/// Metadata of an inbound media message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMedia {
    pub kind: MediaKind,
    pub duration: Duration,
}

impl InboundMedia {
    pub fn voice(duration: Duration) -> Self {
        Self { kind: MediaKind::Voice, duration }
    }

    pub fn audio_file(duration: Duration) -> Self {
        Self { kind: MediaKind::AudioFile, duration }
    }
}

/// Where accepted media should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRoute {
    /// Source audio for effects
    Upload,
    /// Voice sample for cloning
    CloneSample,
}

/// Result of free text sent by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// Text named the cloned voice; the machine is back to `Idle`
    Named(String),
    /// No conversation expects text right now
    Unexpected,
}

/// Trim and truncate a user-supplied voice name
///
/// Counts characters, not bytes, so multi-byte names are never split.
pub fn normalize_voice_name(raw: &str) -> String {
    raw.trim().chars().take(MAX_VOICE_NAME_CHARS).collect()
}

/// Drives the per-user conversation state
#[derive(Debug, Clone)]
pub struct SessionMachine {
    sessions: Arc<SessionStore>,
}

impl SessionMachine {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn pending_mode(&self, user_id: UserId) -> PendingMode {
        self.sessions.get_or_create(user_id).await.pending_mode
    }

    /// `/clone`: start (or restart) sampling from any state
    pub async fn begin_clone(&self, user_id: UserId) {
        self.sessions
            .update(user_id, |s| s.pending_mode = PendingMode::AwaitingCloneSample)
            .await;
        info!(user_id, "Voice cloning started");
    }

    /// Decide how inbound media is treated; never mutates state
    pub async fn route_media(
        &self,
        user_id: UserId,
        media: &InboundMedia,
    ) -> Result<MediaRoute, Rejection> {
        let mode = self.pending_mode(user_id).await;
        let route = match mode {
            PendingMode::AwaitingCloneSample => {
                if media.kind != MediaKind::Voice {
                    return Err(Rejection::SampleNotVoice);
                }
                if media.duration < CLONE_SAMPLE_MIN {
                    return Err(Rejection::SampleTooShort);
                }
                if media.duration > CLONE_SAMPLE_MAX {
                    return Err(Rejection::SampleTooLong);
                }
                MediaRoute::CloneSample
            }
            PendingMode::Idle | PendingMode::AwaitingCloneName => {
                if media.duration > UPLOAD_MAX {
                    return Err(Rejection::UploadTooLong);
                }
                MediaRoute::Upload
            }
        };
        debug!(user_id, ?mode, ?route, duration_ms = media.duration.as_millis() as u64, "Routed media");
        Ok(route)
    }

    /// Commit a downloaded upload: store it and restart pagination
    ///
    /// Returns the upload it replaced, which the caller owns and deletes.
    pub async fn accept_upload(&self, user_id: UserId, path: PathBuf) -> Option<PathBuf> {
        let replaced = self.sessions.set_uploaded_audio(user_id, path.clone()).await;
        replaced.filter(|old| *old != path)
    }

    /// Commit a downloaded clone sample and wait for a name
    pub async fn accept_clone_sample(&self, user_id: UserId, path: PathBuf) {
        self.sessions
            .update(user_id, |s| {
                s.record_clone_sample(path);
                s.pending_mode = PendingMode::AwaitingCloneName;
            })
            .await;
        info!(user_id, "Voice sample recorded");
    }

    /// Free text: names the cloned voice when a name is awaited
    ///
    /// Blank text while naming keeps waiting for a name.
    pub async fn submit_text(&self, user_id: UserId, text: &str) -> TextOutcome {
        let name = normalize_voice_name(text);
        self.sessions
            .update(user_id, |s| {
                if s.pending_mode != PendingMode::AwaitingCloneName || name.is_empty() {
                    return TextOutcome::Unexpected;
                }
                s.cloned_display_name = Some(name.clone());
                s.pending_mode = PendingMode::Idle;
                TextOutcome::Named(name)
            })
            .await
    }

    /// `/skip`: leave the naming step keeping the current name
    pub async fn skip_naming(&self, user_id: UserId) -> Result<String, Rejection> {
        self.sessions
            .update(user_id, |s| {
                if s.pending_mode != PendingMode::AwaitingCloneName {
                    return Err(Rejection::NotNaming);
                }
                s.pending_mode = PendingMode::Idle;
                Ok(s.display_name().to_string())
            })
            .await
    }

    /// `/rename <name>`: rename an existing cloned voice
    pub async fn rename(&self, user_id: UserId, raw_name: &str) -> Result<String, Rejection> {
        let name = normalize_voice_name(raw_name);
        self.sessions
            .update(user_id, |s| {
                if !s.has_cloned_voice() {
                    return Err(Rejection::NoClonedVoice);
                }
                if name.is_empty() {
                    return Err(Rejection::MissingName);
                }
                s.cloned_display_name = Some(name.clone());
                Ok(name)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DEFAULT_VOICE_NAME;

    fn machine() -> SessionMachine {
        SessionMachine::new(Arc::new(SessionStore::new()))
    }

    #[test]
    fn test_normalize_voice_name() {
        assert_eq!(normalize_voice_name("  Robot Me  "), "Robot Me");
        assert_eq!(normalize_voice_name("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmnopqrst");
        assert_eq!(normalize_voice_name("ééééééééééééééééééééééé").chars().count(), 20);
        assert_eq!(normalize_voice_name("   "), "");
    }

    #[tokio::test]
    async fn test_idle_upload_limits() {
        let m = machine();
        assert_eq!(
            m.route_media(1, &InboundMedia::voice(Duration::from_secs(60))).await,
            Ok(MediaRoute::Upload)
        );
        assert_eq!(
            m.route_media(1, &InboundMedia::audio_file(Duration::from_secs(45))).await,
            Ok(MediaRoute::Upload)
        );
        assert_eq!(
            m.route_media(1, &InboundMedia::voice(Duration::from_millis(60_001))).await,
            Err(Rejection::UploadTooLong)
        );
        assert!(m.sessions().get_or_create(1).await.uploaded_audio_path.is_none());
    }

    #[tokio::test]
    async fn test_clone_sample_bounds_inclusive() {
        let m = machine();
        m.begin_clone(1).await;

        for ok in [Duration::from_secs(3), Duration::from_secs(30), Duration::from_secs(10)] {
            assert_eq!(m.route_media(1, &InboundMedia::voice(ok)).await, Ok(MediaRoute::CloneSample));
        }
        assert_eq!(
            m.route_media(1, &InboundMedia::voice(Duration::from_millis(2_999))).await,
            Err(Rejection::SampleTooShort)
        );
        assert_eq!(
            m.route_media(1, &InboundMedia::voice(Duration::from_millis(30_001))).await,
            Err(Rejection::SampleTooLong)
        );
        // Rejections leave the machine waiting for a sample
        assert_eq!(m.pending_mode(1).await, PendingMode::AwaitingCloneSample);
    }

    #[tokio::test]
    async fn test_audio_file_rejected_as_sample() {
        let m = machine();
        m.begin_clone(9).await;
        assert_eq!(
            m.route_media(9, &InboundMedia::audio_file(Duration::from_secs(5))).await,
            Err(Rejection::SampleNotVoice)
        );
        assert_eq!(m.pending_mode(9).await, PendingMode::AwaitingCloneSample);
    }

    #[tokio::test]
    async fn test_sample_then_skip() {
        let m = machine();
        m.begin_clone(5).await;
        m.accept_clone_sample(5, PathBuf::from("cloned_voice_5.ogg")).await;
        assert_eq!(m.pending_mode(5).await, PendingMode::AwaitingCloneName);

        assert_eq!(m.skip_naming(5).await, Ok(DEFAULT_VOICE_NAME.to_string()));
        let session = m.sessions().get_or_create(5).await;
        assert_eq!(session.pending_mode, PendingMode::Idle);
        assert_eq!(session.display_name(), DEFAULT_VOICE_NAME);
    }

    #[tokio::test]
    async fn test_sample_then_name_truncated() {
        let m = machine();
        m.begin_clone(5).await;
        m.accept_clone_sample(5, PathBuf::from("cloned_voice_5.ogg")).await;

        let outcome = m.submit_text(5, "  The Incredible Robot Voice  ").await;
        assert_eq!(outcome, TextOutcome::Named("The Incredible Robot".to_string()));

        let session = m.sessions().get_or_create(5).await;
        assert_eq!(session.pending_mode, PendingMode::Idle);
        assert_eq!(session.display_name(), "The Incredible Robot");
    }

    #[tokio::test]
    async fn test_blank_name_keeps_waiting() {
        let m = machine();
        m.begin_clone(5).await;
        m.accept_clone_sample(5, PathBuf::from("s.ogg")).await;

        assert_eq!(m.submit_text(5, "   ").await, TextOutcome::Unexpected);
        assert_eq!(m.pending_mode(5).await, PendingMode::AwaitingCloneName);
    }

    #[tokio::test]
    async fn test_text_while_idle_is_unexpected() {
        let m = machine();
        assert_eq!(m.submit_text(2, "hello").await, TextOutcome::Unexpected);
        assert!(m.sessions().get_or_create(2).await.cloned_display_name.is_none());
    }

    #[tokio::test]
    async fn test_skip_outside_naming_rejected() {
        let m = machine();
        assert_eq!(m.skip_naming(3).await, Err(Rejection::NotNaming));
        m.begin_clone(3).await;
        assert_eq!(m.skip_naming(3).await, Err(Rejection::NotNaming));
        assert_eq!(m.pending_mode(3).await, PendingMode::AwaitingCloneSample);
    }

    #[tokio::test]
    async fn test_rename_requires_sample_and_name() {
        let m = machine();
        assert_eq!(m.rename(4, "Deep Voice").await, Err(Rejection::NoClonedVoice));

        m.sessions().set_cloned_sample(4, PathBuf::from("s.ogg")).await;
        assert_eq!(m.rename(4, "  ").await, Err(Rejection::MissingName));
        assert_eq!(m.rename(4, "Deep Voice").await, Ok("Deep Voice".to_string()));
        assert_eq!(m.sessions().get_or_create(4).await.display_name(), "Deep Voice");
    }

    #[tokio::test]
    async fn test_upload_while_naming_stays_naming() {
        let m = machine();
        m.begin_clone(8).await;
        m.accept_clone_sample(8, PathBuf::from("s.ogg")).await;

        let route = m.route_media(8, &InboundMedia::voice(Duration::from_secs(20))).await;
        assert_eq!(route, Ok(MediaRoute::Upload));
        assert_eq!(m.accept_upload(8, PathBuf::from("input_8_a.ogg")).await, None);
        assert_eq!(
            m.accept_upload(8, PathBuf::from("input_8_b.ogg")).await,
            Some(PathBuf::from("input_8_a.ogg"))
        );
        assert_eq!(m.accept_upload(8, PathBuf::from("input_8_b.ogg")).await, None);

        let session = m.sessions().get_or_create(8).await;
        assert_eq!(session.pending_mode, PendingMode::AwaitingCloneName);
        assert!(session.cloned_sample_path.is_some());
    }
}
