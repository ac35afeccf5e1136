//! Telegram bot.
//!
//! The transport layer is thin: handlers turn updates into calls on the
//! [`ConversationEngine`] and [`CurrencySelector`], which only know about a
//! [`Store`]. The [`BudgetMonitor`] runs beside the dispatcher and pushes
//! warnings through a [`Messenger`].

use std::sync::Arc;

use engine::{Currency, Store};
use teloxide::{prelude::*, utils::command::BotCommands};

pub use commands::Command;
pub use conversation::{ConversationEngine, Step};
pub use currency::{CurrencyReply, CurrencySelector, TOKEN_PREFIX};
pub use messenger::{Choice, Messenger, MessengerError, Outbound, TelegramMessenger};
pub use monitor::{BudgetMonitor, CycleReport, MonitorSettings};
pub use state::{ExpenseDraft, FlowState, FlowStore, InMemoryFlowStore, Versioned};
pub use teloxide::types::UserId;
pub use texts::SKIP_KEYWORD;

mod commands;
mod conversation;
mod currency;
mod handlers;
mod messenger;
mod monitor;
mod parsing;
mod state;
#[cfg(test)]
mod testing;
mod texts;
mod ui;

#[derive(Clone)]
pub struct ConfigParameters {
    allowed_users: Option<Vec<UserId>>,
    store: Arc<dyn Store>,
    conversation: Arc<ConversationEngine>,
    currencies: Arc<CurrencySelector>,
    messenger: Arc<dyn Messenger>,
}

pub struct Bot {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    currencies: Vec<Currency>,
    store: Arc<dyn Store>,
    flows: Arc<dyn FlowStore>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Dispatches updates until Ctrl-C.
    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);
        if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
            tracing::warn!("failed to register bot commands: {err}");
        }

        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            store: self.store.clone(),
            conversation: Arc::new(ConversationEngine::new(
                self.store.clone(),
                self.flows.clone(),
            )),
            currencies: Arc::new(CurrencySelector::new(
                self.store.clone(),
                self.currencies.clone(),
            )),
            messenger: Arc::new(TelegramMessenger::new(bot.clone())),
        };

        Dispatcher::builder(bot, handlers::schema())
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        tracing::info!("Telegram bot stopped");
    }

    /// Budget monitor sending through this bot's token.
    pub fn budget_monitor(&self, settings: MonitorSettings) -> BudgetMonitor {
        let messenger = TelegramMessenger::new(teloxide::Bot::new(&self.token));
        BudgetMonitor::new(self.store.clone(), Arc::new(messenger), settings)
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    currencies: Vec<Currency>,
    store: Option<Arc<dyn Store>>,
    flows: Option<Arc<dyn FlowStore>>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    /// An empty list lets everyone in.
    pub fn allowed_users(mut self, allowed_users: Vec<UserId>) -> BotBuilder {
        if !allowed_users.is_empty() {
            self.allowed_users = Some(allowed_users);
        }
        self
    }

    /// Codes offered by the currency picker, in display order.
    pub fn currencies(mut self, currencies: Vec<Currency>) -> BotBuilder {
        self.currencies = currencies;
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> BotBuilder {
        self.store = Some(store);
        self
    }

    /// Defaults to an [`InMemoryFlowStore`].
    pub fn flows(mut self, flows: Arc<dyn FlowStore>) -> BotBuilder {
        self.flows = Some(flows);
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.is_empty() {
            return Err("telegram token is empty".to_string());
        }
        if self.currencies.is_empty() {
            return Err("at least one currency must be configured".to_string());
        }
        let store = self.store.ok_or("a store is required")?;
        let flows = self
            .flows
            .unwrap_or_else(|| Arc::new(InMemoryFlowStore::default()));

        Ok(Bot {
            token: self.token,
            allowed_users: self.allowed_users,
            currencies: self.currencies,
            store,
            flows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;

    fn uah() -> Vec<Currency> {
        vec![Currency::try_from("UAH").unwrap()]
    }

    #[test]
    fn builder_requires_token_store_and_currencies() {
        let store: Arc<dyn Store> = Arc::new(FakeStore::default());

        assert!(Bot::builder().store(store.clone()).currencies(uah()).build().is_err());
        assert!(Bot::builder().token("t").currencies(uah()).build().is_err());
        assert!(Bot::builder().token("t").store(store.clone()).build().is_err());
        assert!(
            Bot::builder()
                .token("t")
                .store(store)
                .currencies(uah())
                .build()
                .is_ok()
        );
    }

    #[test]
    fn empty_allow_list_means_everyone() {
        let bot = Bot::builder()
            .token("t")
            .store(Arc::new(FakeStore::default()))
            .currencies(uah())
            .allowed_users(Vec::new())
            .build()
            .unwrap();
        assert!(bot.allowed_users.is_none());
    }
}
