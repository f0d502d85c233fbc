//! Bot API client over HTTPS

use super::types::{ApiResponse, File, InlineKeyboardMarkup, Message, Update};
use crate::error::{Error, Result};
use crate::transport::{ChatId, ChatTransport, Keyboard, MessageId, TextFormat};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_API_ROOT: &str = "https://api.telegram.org";
const USER_AGENT: &str = concat!("vfx-bot/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time allowed on top of the long-poll timeout
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram refuses edits that change nothing; harmless for us
const NOT_MODIFIED: &str = "message is not modified";

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct GetFile<'a> {
    file_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct EditMessageText<'a> {
    chat_id: ChatId,
    message_id: MessageId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

fn parse_mode(format: TextFormat) -> Option<&'static str> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Markdown => Some("Markdown"),
    }
}

/// Telegram Bot API client
pub struct TelegramClient {
    http_client: reqwest::Client,
    /// `<root>/bot<token>`
    api_base: String,
    /// `<root>/file/bot<token>`
    file_base: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_root(DEFAULT_API_ROOT, token)
    }

    /// Client against a custom Bot API server (self-hosted or test double)
    pub fn with_api_root(api_root: &str, token: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let root = api_root.trim_end_matches('/');
        Ok(Self {
            http_client,
            api_base: format!("{}/bot{}", root, token),
            file_base: format!("{}/file/bot{}", root, token),
        })
    }

    /// Invoke a Bot API method with a JSON body
    async fn call<P, T>(&self, method: &str, params: &P, timeout: Option<Duration>) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .http_client
            .post(format!("{}/{}", self.api_base, method))
            .json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        Self::unwrap_response(method, response.json().await?)
    }

    fn unwrap_response<T>(method: &str, response: ApiResponse<T>) -> Result<T> {
        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                parameters,
                ..
            } => {
                let mut message = format!(
                    "{} failed ({}): {}",
                    method,
                    error_code.map_or_else(|| "no code".to_string(), |c| c.to_string()),
                    description.unwrap_or_else(|| "no description".to_string())
                );
                if let Some(retry_after) = parameters.and_then(|p| p.retry_after) {
                    message.push_str(&format!(" (retry after {}s)", retry_after));
                }
                Err(Error::Telegram(message))
            }
        }
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> Result<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: poll_timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };
        self.call("getUpdates", &params, Some(poll_timeout + POLL_GRACE))
            .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", &GetFile { file_id }, None).await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn download(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self.get_file(file_id).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| Error::Telegram(format!("No download path for file {}", file_id)))?;

        let response = self
            .http_client
            .get(format!("{}/{}", self.file_base, file_path))
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!(file_id, bytes = bytes.len(), dest = %dest.display(), "Downloaded file");
        Ok(())
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: TextFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId> {
        let params = SendMessage {
            chat_id,
            text,
            parse_mode: parse_mode(format),
            reply_markup: keyboard.map(InlineKeyboardMarkup::from),
        };
        let message: Message = self.call("sendMessage", &params, None).await?;
        Ok(message.message_id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        format: TextFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let params = EditMessageText {
            chat_id,
            message_id,
            text,
            parse_mode: parse_mode(format),
            reply_markup: keyboard.map(InlineKeyboardMarkup::from),
        };
        // Result is the edited Message, or `true` for inline messages
        match self
            .call::<_, serde_json::Value>("editMessageText", &params, None)
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Telegram(message)) if message.contains(NOT_MODIFIED) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send_voice(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice.ogg".to_string());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part(
                "voice",
                Part::bytes(bytes).file_name(file_name).mime_str("audio/ogg")?,
            );

        let response = self
            .http_client
            .post(format!("{}/sendVoice", self.api_base))
            .multipart(form)
            .send()
            .await?;
        let _: Message = Self::unwrap_response("sendVoice", response.json().await?)?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let params = AnswerCallbackQuery {
            callback_query_id: callback_id,
            text,
        };
        let _: bool = self.call("answerCallbackQuery", &params, None).await?;
        Ok(())
    }
}
