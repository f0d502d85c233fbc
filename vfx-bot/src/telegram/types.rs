//! Bot API wire types
//!
//! Only the fields the bot reads are modelled; serde ignores the rest.

use crate::transport::{EventKind, InboundEvent, Keyboard, MediaRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vfx_common::InboundMedia;

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait after a flood-control rejection
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub voice: Option<Voice>,
    pub audio: Option<Audio>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Recorded voice note
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub file_id: String,
    /// Seconds, as reported by the sender
    pub duration: u64,
}

/// Audio file sent as music
#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    pub file_id: String,
    pub duration: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Result of `getFile`
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    /// Relative download path; absent once the link has expired
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| InlineKeyboardButton {
                            text: b.text.clone(),
                            callback_data: b.data.clone(),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

impl Update {
    /// Convert to a platform-neutral event
    ///
    /// Returns `None` for updates the bot does not handle (edits, channel
    /// posts, messages from other bots, stickers and so on).
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            let message = query.message?;
            return Some(InboundEvent {
                user_id: query.from.id,
                chat_id: message.chat.id,
                kind: EventKind::Callback {
                    callback_id: query.id,
                    message_id: message.message_id,
                    data: query.data.unwrap_or_default(),
                },
            });
        }

        let message = self.message?;
        let from = message.from.filter(|u| !u.is_bot)?;

        let kind = if let Some(voice) = message.voice {
            EventKind::Media(MediaRef {
                file_id: voice.file_id,
                media: InboundMedia::voice(Duration::from_secs(voice.duration)),
            })
        } else if let Some(audio) = message.audio {
            EventKind::Media(MediaRef {
                file_id: audio.file_id,
                media: InboundMedia::audio_file(Duration::from_secs(audio.duration)),
            })
        } else {
            EventKind::Text(message.text?)
        };

        Some(InboundEvent {
            user_id: from.id,
            chat_id: message.chat.id,
            kind,
        })
    }
}
