//! Messaging transport contract
//!
//! Handlers only talk to the chat platform through [`ChatTransport`], which
//! keeps them testable with a recording fake.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use vfx_common::{InboundMedia, UserId};

pub type ChatId = i64;
pub type MessageId = i64;

/// Inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    /// Callback payload returned when pressed
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl ToString) -> Self {
        Self {
            text: text.into(),
            data: data.to_string(),
        }
    }
}

/// Rows of inline buttons attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn push_row(&mut self, row: Vec<Button>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    /// All buttons in display order
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// How message text is parsed by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Markdown,
}

/// Media attached to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// Platform handle used to download the file
    pub file_id: String,
    pub media: InboundMedia,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Text(String),
    Media(MediaRef),
    /// Inline button press on one of our messages
    Callback {
        callback_id: String,
        message_id: MessageId,
        data: String,
    },
}

/// Platform-neutral inbound update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub kind: EventKind,
}

/// Outbound operations the bot needs from the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Save an inbound file to `dest`
    async fn download(&self, file_id: &str, dest: &Path) -> Result<()>;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: TextFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId>;

    /// Replace the text (and keyboard) of a message we sent
    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        format: TextFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    /// Upload `path` as a voice message
    async fn send_voice(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<()>;

    /// Acknowledge a button press (clears the client spinner)
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
