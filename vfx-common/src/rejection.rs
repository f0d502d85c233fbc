//! User-facing validation failures
//!
//! A rejection never changes session state. Its `Display` text is the message
//! shown to the user, so handlers can reply with `rejection.to_string()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("⚠️ Audio is too long. Please send audio under 60 seconds for processing.")]
    UploadTooLong,

    #[error("⚠️ Voice sample is too short. Please send a sample of at least 3 seconds.")]
    SampleTooShort,

    #[error("⚠️ Voice sample is too long. Please keep it under 30 seconds for better results.")]
    SampleTooLong,

    #[error("❌ Please send a *voice message* (not audio file) for cloning.")]
    SampleNotVoice,

    #[error("❌ No audio found. Please send or forward a voice message first.")]
    NoUploadedAudio,

    #[error("❌ You haven't cloned your voice yet. Use the /clone command first.")]
    NoClonedVoice,

    #[error("❓ You're not currently naming a voice. Use /clone to clone your voice first.")]
    NotNaming,

    #[error("Please provide a name for your voice.\n\nExample: `/rename Cool Voice`")]
    MissingName,

    #[error("❌ Unknown effect. Please pick one from the menu.")]
    UnknownEffect(String),
}

impl Rejection {
    /// Whether the message uses Markdown emphasis
    pub fn is_markdown(&self) -> bool {
        matches!(self, Rejection::SampleNotVoice | Rejection::MissingName)
    }
}
