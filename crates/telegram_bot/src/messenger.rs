//! Outbound side of the transport.
//!
//! The core never touches teloxide: it returns [`Outbound`] values and the
//! budget monitor pushes through a [`Messenger`].

use async_trait::async_trait;
use engine::UserIdentity;
use teloxide::{ApiError, RequestError, prelude::*, types::ChatId};

use crate::ui;

/// A button: what the user sees and the opaque token sent back on press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Choice { text: String, choices: Vec<Choice> },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text(text.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("telegram request failed: {0}")]
    Request(#[from] RequestError),
    #[error("user {0} cannot be reached")]
    Unreachable(UserIdentity),
}

impl MessengerError {
    /// Tells a user who blocked the bot apart from a transport failure.
    fn from_request(to: UserIdentity, err: RequestError) -> Self {
        match err {
            RequestError::Api(
                ApiError::BotBlocked | ApiError::ChatNotFound | ApiError::UserDeactivated,
            ) => MessengerError::Unreachable(to),
            other => MessengerError::Request(other),
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: UserIdentity, text: &str) -> Result<(), MessengerError>;

    async fn send_choice(
        &self,
        to: UserIdentity,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError>;

    async fn deliver(&self, to: UserIdentity, message: &Outbound) -> Result<(), MessengerError> {
        match message {
            Outbound::Text(text) => self.send_text(to, text).await,
            Outbound::Choice { text, choices } => self.send_choice(to, text, choices).await,
        }
    }
}

/// [`Messenger`] over the Telegram Bot API.
///
/// Messages go to the user's private chat, whose id equals the user id.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, to: UserIdentity, text: &str) -> Result<(), MessengerError> {
        self.bot
            .send_message(ChatId(to.0), text)
            .await
            .map_err(|err| MessengerError::from_request(to, err))?;
        Ok(())
    }

    async fn send_choice(
        &self,
        to: UserIdentity,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError> {
        self.bot
            .send_message(ChatId(to.0), text)
            .reply_markup(ui::choice_keyboard(choices))
            .await
            .map_err(|err| MessengerError::from_request(to, err))?;
        Ok(())
    }
}
