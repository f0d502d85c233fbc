//! Update handlers
//!
//! [`Bot::handle`] processes one inbound event end to end. Each event runs in
//! its own task; any error is caught here, logged, and answered with a
//! generic failure message so one user's problem never reaches another.

use crate::error::Result;
use crate::presentation::{self, effect_keyboard, menu_text};
use crate::scratch::ScratchDir;
use crate::transport::{ChatId, ChatTransport, EventKind, InboundEvent, Keyboard, MediaRef, MessageId, TextFormat};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vfx_common::dispatch::remove_file_quietly;
use vfx_common::{
    CallbackData, Dispatcher, EffectCatalog, EffectChoice, MediaRoute, PageRequest, PendingMode, Rejection,
    SessionMachine, SessionStore, TextOutcome, TransformInvoker, UserId,
};

/// Bot commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Clone,
    /// Argument text, possibly empty
    Rename(String),
    Skip,
    Unknown(String),
}

impl Command {
    /// Parse `/name[@bot] args`; `None` if the text is not a command
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "clone" => Command::Clone,
            "rename" => Command::Rename(args.to_string()),
            "skip" => Command::Skip,
            _ => Command::Unknown(name),
        })
    }
}

/// Voice effects bot over any transport and transform backend
pub struct Bot<T, I> {
    transport: T,
    invoker: I,
    machine: SessionMachine,
    dispatcher: Dispatcher,
    scratch: ScratchDir,
}

impl<T, I> Bot<T, I>
where
    T: ChatTransport,
    I: TransformInvoker,
{
    pub fn new(
        transport: T,
        invoker: I,
        catalog: Arc<EffectCatalog>,
        sessions: Arc<SessionStore>,
        scratch: ScratchDir,
        page_size: usize,
    ) -> Self {
        Self {
            transport,
            invoker,
            machine: SessionMachine::new(Arc::clone(&sessions)),
            dispatcher: Dispatcher::new(catalog, sessions, page_size),
            scratch,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.machine.sessions()
    }

    /// Handle one event, never failing
    pub async fn handle(&self, event: InboundEvent) {
        let user_id = event.user_id;
        let chat_id = event.chat_id;

        let result = match event.kind {
            EventKind::Text(text) => self.on_text(user_id, chat_id, &text).await,
            EventKind::Media(media) => self.on_media(user_id, chat_id, media).await,
            EventKind::Callback {
                callback_id,
                message_id,
                data,
            } => {
                self.on_callback(user_id, chat_id, &callback_id, message_id, &data)
                    .await
            }
        };

        if let Err(e) = result {
            error!(user_id, error = %e, "Error handling update");
            if let Err(e) = self
                .transport
                .send_text(chat_id, presentation::GENERIC_FAILURE, TextFormat::Plain, None)
                .await
            {
                warn!(user_id, error = %e, "Failed to send failure notice");
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str, format: TextFormat) -> Result<()> {
        self.transport.send_text(chat_id, text, format, None).await?;
        Ok(())
    }

    async fn reply_rejection(&self, user_id: UserId, chat_id: ChatId, rejection: &Rejection) -> Result<()> {
        debug!(user_id, ?rejection, "Rejected");
        self.reply(chat_id, &rejection.to_string(), rejection_format(rejection))
            .await
    }

    async fn on_text(&self, user_id: UserId, chat_id: ChatId, text: &str) -> Result<()> {
        if let Some(command) = Command::parse(text) {
            return self.on_command(user_id, chat_id, command).await;
        }

        match self.machine.submit_text(user_id, text).await {
            TextOutcome::Named(name) => {
                info!(user_id, "Cloned voice named");
                self.reply(chat_id, &presentation::voice_named(&name), TextFormat::Markdown)
                    .await
            }
            TextOutcome::Unexpected => {
                if self.machine.pending_mode(user_id).await == PendingMode::AwaitingCloneName {
                    self.reply(chat_id, presentation::SAMPLE_RECORDED, TextFormat::Markdown)
                        .await
                } else {
                    self.reply(chat_id, presentation::TEXT_HINT, TextFormat::Plain).await
                }
            }
        }
    }

    async fn on_command(&self, user_id: UserId, chat_id: ChatId, command: Command) -> Result<()> {
        debug!(user_id, ?command, "Command");
        match command {
            Command::Start => self.reply(chat_id, presentation::WELCOME, TextFormat::Markdown).await,
            Command::Help => self.reply(chat_id, presentation::HELP, TextFormat::Markdown).await,
            Command::Clone => {
                self.machine.begin_clone(user_id).await;
                self.reply(chat_id, presentation::CLONE_PROMPT, TextFormat::Markdown)
                    .await
            }
            Command::Rename(name) => match self.machine.rename(user_id, &name).await {
                Ok(name) => {
                    self.reply(chat_id, &presentation::voice_renamed(&name), TextFormat::Markdown)
                        .await
                }
                Err(rejection) => self.reply_rejection(user_id, chat_id, &rejection).await,
            },
            Command::Skip => match self.machine.skip_naming(user_id).await {
                Ok(name) => {
                    self.reply(chat_id, &presentation::default_name_kept(&name), TextFormat::Markdown)
                        .await
                }
                Err(rejection) => self.reply_rejection(user_id, chat_id, &rejection).await,
            },
            Command::Unknown(_) => {
                self.reply(chat_id, presentation::UNKNOWN_COMMAND, TextFormat::Plain)
                    .await
            }
        }
    }

    async fn on_media(&self, user_id: UserId, chat_id: ChatId, media: MediaRef) -> Result<()> {
        let route = match self.machine.route_media(user_id, &media.media).await {
            Ok(route) => route,
            Err(rejection) => return self.reply_rejection(user_id, chat_id, &rejection).await,
        };

        match route {
            MediaRoute::Upload => {
                let path = self.scratch.fresh_input_path(user_id);
                if let Err(e) = self.transport.download(&media.file_id, &path).await {
                    error!(user_id, error = %e, "Failed to download upload");
                    remove_file_quietly(&path).await;
                    return self.reply(chat_id, presentation::UPLOAD_FAILED, TextFormat::Plain).await;
                }
                if let Some(replaced) = self.machine.accept_upload(user_id, path).await {
                    remove_file_quietly(&replaced).await;
                }
                info!(user_id, duration_secs = media.media.duration.as_secs(), "Audio uploaded");

                let (text, keyboard) = self.menu(user_id).await;
                self.transport
                    .send_text(chat_id, &text, TextFormat::Markdown, Some(&keyboard))
                    .await?;
                Ok(())
            }
            MediaRoute::CloneSample => {
                let path = self.scratch.clone_sample_path(user_id);
                if let Err(e) = self.transport.download(&media.file_id, &path).await {
                    error!(user_id, error = %e, "Failed to download voice sample");
                    return self.reply(chat_id, presentation::CLONE_FAILED, TextFormat::Plain).await;
                }
                self.machine.accept_clone_sample(user_id, path).await;
                self.reply(chat_id, presentation::SAMPLE_RECORDED, TextFormat::Markdown)
                    .await
            }
        }
    }

    /// Menu text and keyboard for the user's current page
    async fn menu(&self, user_id: UserId) -> (String, Keyboard) {
        let session = self.sessions().get_or_create(user_id).await;
        let cloned_name = session
            .has_cloned_voice()
            .then(|| session.display_name().to_string());

        let keyboard = effect_keyboard(
            self.dispatcher.catalog(),
            session.current_page,
            self.dispatcher.page_size(),
            cloned_name.as_deref(),
        );
        (menu_text(cloned_name.as_deref()), keyboard)
    }

    async fn on_callback(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        callback_id: &str,
        message_id: MessageId,
        data: &str,
    ) -> Result<()> {
        let data = match data.parse::<CallbackData>() {
            Ok(data) => data,
            Err(e) => {
                warn!(user_id, error = %e, "Ignoring button press");
                self.transport
                    .answer_callback(callback_id, Some(presentation::INVALID_BUTTON))
                    .await?;
                return Ok(());
            }
        };

        if let Err(e) = self.transport.answer_callback(callback_id, None).await {
            warn!(user_id, error = %e, "Failed to answer callback");
        }

        match data {
            CallbackData::Page(request) => {
                self.dispatcher.navigate(user_id, request).await;
                if request == PageRequest::Info {
                    return Ok(());
                }
                let (text, keyboard) = self.menu(user_id).await;
                self.transport
                    .edit_text(chat_id, message_id, &text, TextFormat::Markdown, Some(&keyboard))
                    .await
            }
            CallbackData::Effect(choice) => self.apply_effect(user_id, chat_id, message_id, &choice).await,
        }
    }

    /// Run the chosen effect and deliver the result
    async fn apply_effect(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        message_id: MessageId,
        choice: &EffectChoice,
    ) -> Result<()> {
        let job = match self.dispatcher.prepare(user_id, choice).await {
            Ok(job) => job,
            Err(rejection) => {
                debug!(user_id, ?rejection, "Effect rejected");
                return self
                    .transport
                    .edit_text(
                        chat_id,
                        message_id,
                        &rejection.to_string(),
                        rejection_format(&rejection),
                        None,
                    )
                    .await;
            }
        };

        self.transport
            .edit_text(
                chat_id,
                message_id,
                &presentation::processing(&job.label),
                TextFormat::Markdown,
                None,
            )
            .await?;

        let output = self.scratch.fresh_output_path(user_id);
        if self.dispatcher.run(&self.invoker, &job, &output).await.is_err() {
            remove_file_quietly(&output).await;
            // Upload is kept; offer the menu again
            let (_, keyboard) = self.menu(user_id).await;
            return self
                .transport
                .edit_text(
                    chat_id,
                    message_id,
                    presentation::EFFECT_FAILED,
                    TextFormat::Plain,
                    Some(&keyboard),
                )
                .await;
        }

        let sent = self
            .transport
            .send_voice(chat_id, &output, &presentation::voice_caption(&job.label))
            .await;
        remove_file_quietly(&output).await;
        sent?;

        self.dispatcher.complete(&job).await;
        self.transport
            .edit_text(
                chat_id,
                message_id,
                &presentation::applied(&job.label),
                TextFormat::Markdown,
                None,
            )
            .await?;
        self.reply(chat_id, presentation::SEND_ANOTHER, TextFormat::Plain).await
    }
}

fn rejection_format(rejection: &Rejection) -> TextFormat {
    if rejection.is_markdown() {
        TextFormat::Markdown
    } else {
        TextFormat::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help@VoiceFxBot"), Some(Command::Help));
        assert_eq!(Command::parse("/CLONE"), Some(Command::Clone));
        assert_eq!(
            Command::parse("/rename   Deep  Voice "),
            Some(Command::Rename("Deep  Voice".to_string()))
        );
        assert_eq!(Command::parse("/rename"), Some(Command::Rename(String::new())));
        assert_eq!(Command::parse("/skip"), Some(Command::Skip));
        assert_eq!(Command::parse("/say hello"), Some(Command::Unknown("say".to_string())));
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("Robot Me"), None);
        assert_eq!(Command::parse("a/b"), None);
    }
}
