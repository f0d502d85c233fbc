//! Effect dispatch
//!
//! Handles the two kinds of menu button presses:
//! - pagination: clamp the requested page into range and remember it
//! - effect selection: resolve the effect against the user's session and run
//!   it through a [`TransformInvoker`]
//!
//! Cleanup policy, identical for every effect: a failed transform leaves the
//! session and its upload untouched so the user can retry. After a successful
//! transform has been delivered, the upload is deleted and cleared from the
//! session. The caller always deletes the transform output.

use crate::catalog::{cloned_voice_transform, EffectCatalog, TransformSpec, CLONED_EFFECT_ID};
use crate::invoker::{TransformError, TransformInvoker};
use crate::rejection::Rejection;
use crate::session::{SessionStore, UserId};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const PAGE_PREFIX: &str = "page";
const EFFECT_PREFIX: &str = "effect";

/// Pagination button payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Jump to an absolute page (clamped)
    Goto(i64),
    Prev,
    Next,
    /// Page indicator button; redisplays the current page
    Info,
}

/// Effect button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectChoice {
    Catalog(String),
    ClonedVoice,
}

/// Decoded inline button data (`page:<n|prev|next|info>` or `effect:<id>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackData {
    Page(PageRequest),
    Effect(EffectChoice),
}

impl FromStr for CallbackData {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let (prefix, value) = raw
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("Malformed callback data: {}", raw)))?;

        match prefix {
            PAGE_PREFIX => {
                let request = match value {
                    "prev" => PageRequest::Prev,
                    "next" => PageRequest::Next,
                    "info" => PageRequest::Info,
                    n => PageRequest::Goto(n.parse().map_err(|_| {
                        Error::InvalidInput(format!("Invalid page in callback data: {}", raw))
                    })?),
                };
                Ok(CallbackData::Page(request))
            }
            EFFECT_PREFIX if value.is_empty() => {
                Err(Error::InvalidInput(format!("Empty effect in callback data: {}", raw)))
            }
            EFFECT_PREFIX if value == CLONED_EFFECT_ID => Ok(CallbackData::Effect(EffectChoice::ClonedVoice)),
            EFFECT_PREFIX => Ok(CallbackData::Effect(EffectChoice::Catalog(value.to_string()))),
            _ => Err(Error::InvalidInput(format!("Unknown callback data: {}", raw))),
        }
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackData::Page(PageRequest::Goto(n)) => write!(f, "{}:{}", PAGE_PREFIX, n),
            CallbackData::Page(PageRequest::Prev) => write!(f, "{}:prev", PAGE_PREFIX),
            CallbackData::Page(PageRequest::Next) => write!(f, "{}:next", PAGE_PREFIX),
            CallbackData::Page(PageRequest::Info) => write!(f, "{}:info", PAGE_PREFIX),
            CallbackData::Effect(EffectChoice::ClonedVoice) => {
                write!(f, "{}:{}", EFFECT_PREFIX, CLONED_EFFECT_ID)
            }
            CallbackData::Effect(EffectChoice::Catalog(id)) => write!(f, "{}:{}", EFFECT_PREFIX, id),
        }
    }
}

/// A resolved effect request, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformJob {
    pub user_id: UserId,
    /// Name shown to the user
    pub label: String,
    pub input: PathBuf,
    pub transform: TransformSpec,
}

/// Resolves menu presses against the catalog and the session store
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: Arc<EffectCatalog>,
    sessions: Arc<SessionStore>,
    page_size: usize,
}

impl Dispatcher {
    pub fn new(catalog: Arc<EffectCatalog>, sessions: Arc<SessionStore>, page_size: usize) -> Self {
        Self {
            catalog,
            sessions,
            page_size,
        }
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.catalog.total_pages(self.page_size)
    }

    /// Apply a pagination request; returns the (clamped) page now shown
    pub async fn navigate(&self, user_id: UserId, request: PageRequest) -> usize {
        let catalog = &self.catalog;
        let page_size = self.page_size;
        let page = self
            .sessions
            .update(user_id, |s| {
                let current = s.current_page as i64;
                let requested = match request {
                    PageRequest::Goto(n) => n,
                    PageRequest::Prev => current.saturating_sub(1),
                    PageRequest::Next => current.saturating_add(1),
                    PageRequest::Info => current,
                };
                s.current_page = catalog.clamp_page(requested, page_size);
                s.current_page
            })
            .await;
        debug!(user_id, ?request, page, "Navigated effect menu");
        page
    }

    /// Resolve an effect choice; fails without side effects
    pub async fn prepare(&self, user_id: UserId, choice: &EffectChoice) -> std::result::Result<TransformJob, Rejection> {
        let session = self.sessions.get_or_create(user_id).await;
        let input = session.uploaded_audio_path.clone().ok_or(Rejection::NoUploadedAudio)?;

        let (label, transform) = match choice {
            EffectChoice::ClonedVoice => {
                if !session.has_cloned_voice() {
                    return Err(Rejection::NoClonedVoice);
                }
                (format!("Clone: {}", session.display_name()), cloned_voice_transform())
            }
            EffectChoice::Catalog(id) => {
                let entry = self
                    .catalog
                    .get(id)
                    .ok_or_else(|| Rejection::UnknownEffect(id.clone()))?;
                (entry.identifier.clone(), entry.transform.clone())
            }
        };

        Ok(TransformJob {
            user_id,
            label,
            input,
            transform,
        })
    }

    /// Run a prepared job, writing the result to `output`
    ///
    /// Failures are logged here with full detail; session state is not touched.
    pub async fn run<I>(&self, invoker: &I, job: &TransformJob, output: &Path) -> std::result::Result<(), TransformError>
    where
        I: TransformInvoker + ?Sized,
    {
        let started = Instant::now();
        match invoker.invoke(&job.input, &job.transform, output).await {
            Ok(()) => {
                info!(
                    user_id = job.user_id,
                    effect = %job.label,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Effect applied"
                );
                Ok(())
            }
            Err(e) => {
                error!(user_id = job.user_id, effect = %job.label, error = %e, "Error applying effect");
                Err(e)
            }
        }
    }

    /// Successful delivery: forget and delete the upload
    ///
    /// The session is only cleared if it still points at the job's input; a
    /// newer upload stored meanwhile is kept.
    pub async fn complete(&self, job: &TransformJob) {
        let cleared = self
            .sessions
            .update(job.user_id, |s| {
                if s.uploaded_audio_path.as_deref() == Some(job.input.as_path()) {
                    s.uploaded_audio_path = None;
                    true
                } else {
                    false
                }
            })
            .await;

        if cleared {
            remove_file_quietly(&job.input).await;
        }
    }
}

/// Best-effort file deletion; a missing file is not an error
pub async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EffectEntry;

    fn dispatcher(n: usize) -> Dispatcher {
        let catalog = EffectCatalog::from_entries(
            (0..n).map(|i| EffectEntry::filter(format!("fx{}", i), "areverse")).collect(),
        )
        .unwrap();
        Dispatcher::new(Arc::new(catalog), Arc::new(SessionStore::new()), 8)
    }

    #[test]
    fn test_callback_data_parsing() {
        assert_eq!("page:3".parse::<CallbackData>().unwrap(), CallbackData::Page(PageRequest::Goto(3)));
        assert_eq!("page:-2".parse::<CallbackData>().unwrap(), CallbackData::Page(PageRequest::Goto(-2)));
        assert_eq!("page:next".parse::<CallbackData>().unwrap(), CallbackData::Page(PageRequest::Next));
        assert_eq!("page:prev".parse::<CallbackData>().unwrap(), CallbackData::Page(PageRequest::Prev));
        assert_eq!("page:info".parse::<CallbackData>().unwrap(), CallbackData::Page(PageRequest::Info));
        assert_eq!(
            "effect:cloned".parse::<CallbackData>().unwrap(),
            CallbackData::Effect(EffectChoice::ClonedVoice)
        );
        assert_eq!(
            "effect:speed_x0.5".parse::<CallbackData>().unwrap(),
            CallbackData::Effect(EffectChoice::Catalog("speed_x0.5".to_string()))
        );
    }

    #[test]
    fn test_callback_data_rejects_garbage() {
        for raw in ["", "page", "page:", "page:abc", "effect:", "volume:3", "nonsense"] {
            assert!(raw.parse::<CallbackData>().is_err(), "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_callback_data_display_matches_parse() {
        let samples = [
            CallbackData::Page(PageRequest::Goto(4)),
            CallbackData::Page(PageRequest::Next),
            CallbackData::Effect(EffectChoice::ClonedVoice),
            CallbackData::Effect(EffectChoice::Catalog("echo_long".to_string())),
        ];
        for data in samples {
            assert_eq!(data.to_string().parse::<CallbackData>().unwrap(), data);
        }
    }

    #[tokio::test]
    async fn test_navigate_clamps() {
        let d = dispatcher(20); // 3 pages

        assert_eq!(d.navigate(1, PageRequest::Prev).await, 0);
        assert_eq!(d.navigate(1, PageRequest::Next).await, 1);
        assert_eq!(d.navigate(1, PageRequest::Next).await, 2);
        assert_eq!(d.navigate(1, PageRequest::Next).await, 2);
        assert_eq!(d.navigate(1, PageRequest::Info).await, 2);
        assert_eq!(d.navigate(1, PageRequest::Goto(-7)).await, 0);
        assert_eq!(d.navigate(1, PageRequest::Goto(99)).await, 2);
        assert_eq!(d.sessions.get_or_create(1).await.current_page, 2);
    }

    #[tokio::test]
    async fn test_prepare_requires_upload() {
        let d = dispatcher(4);
        let result = d.prepare(1, &EffectChoice::Catalog("fx0".to_string())).await;
        assert_eq!(result, Err(Rejection::NoUploadedAudio));
    }

    #[tokio::test]
    async fn test_prepare_cloned_requires_sample() {
        let d = dispatcher(4);
        d.sessions.set_uploaded_audio(1, PathBuf::from("in.ogg")).await;
        assert_eq!(d.prepare(1, &EffectChoice::ClonedVoice).await, Err(Rejection::NoClonedVoice));

        d.sessions.set_cloned_sample(1, PathBuf::from("sample.ogg")).await;
        let job = d.prepare(1, &EffectChoice::ClonedVoice).await.unwrap();
        assert_eq!(job.label, "Clone: My Voice");
        assert_eq!(job.transform, cloned_voice_transform());
        assert_eq!(job.input, PathBuf::from("in.ogg"));
    }

    #[tokio::test]
    async fn test_prepare_unknown_effect() {
        let d = dispatcher(4);
        d.sessions.set_uploaded_audio(1, PathBuf::from("in.ogg")).await;
        assert_eq!(
            d.prepare(1, &EffectChoice::Catalog("missing".to_string())).await,
            Err(Rejection::UnknownEffect("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_complete_clears_matching_upload_only() {
        let d = dispatcher(4);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input_1_0a1b2c3d.ogg");
        tokio::fs::write(&input, b"ogg").await.unwrap();

        d.sessions.set_uploaded_audio(1, input.clone()).await;
        let job = d.prepare(1, &EffectChoice::Catalog("fx1".to_string())).await.unwrap();

        // A newer upload replaced the job's input
        let newer = dir.path().join("input_1_4e5f6a7b.ogg");
        d.sessions.set_uploaded_audio(1, newer.clone()).await;
        d.complete(&job).await;
        assert_eq!(d.sessions.get_or_create(1).await.uploaded_audio_path, Some(newer));
        assert!(input.exists());

        d.sessions.set_uploaded_audio(1, input.clone()).await;
        d.complete(&job).await;
        assert!(d.sessions.get_or_create(1).await.uploaded_audio_path.is_none());
        assert!(!input.exists());
    }

    #[tokio::test]
    async fn test_remove_file_quietly_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_quietly(&dir.path().join("nope.ogg")).await;
    }
}
