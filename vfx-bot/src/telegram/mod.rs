//! Telegram Bot API transport
//!
//! Long polling with `getUpdates`; replies through the handful of methods
//! the bot uses. See [`client::TelegramClient`].

pub mod client;
pub mod types;

pub use client::TelegramClient;
pub use types::Update;
