//! # Voice Effects Common Library
//!
//! Transport-independent core of the voice effects bot:
//! - Effect catalog and pagination
//! - Per-user session store
//! - Session state machine (voice cloning conversation)
//! - Effect dispatch and callback data codec
//! - Media transform invoker contract
//! - Configuration loading

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod machine;
pub mod rejection;
pub mod session;

pub use catalog::{EffectCatalog, EffectEntry, TransformSpec};
pub use config::{BotConfig, ConfigOverrides, TomlConfig};
pub use dispatch::{CallbackData, Dispatcher, EffectChoice, PageRequest, TransformJob};
pub use error::{Error, Result};
pub use invoker::{TransformError, TransformInvoker};
pub use machine::{InboundMedia, MediaKind, MediaRoute, SessionMachine, TextOutcome};
pub use rejection::Rejection;
pub use session::{PendingMode, SessionStore, UserId, UserSession};
