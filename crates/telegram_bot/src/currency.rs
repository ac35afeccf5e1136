//! Currency picker shown after `/start` and on `/setcurrency`.

use std::sync::Arc;

use engine::{Currency, Store, UserIdentity};

use crate::{
    messenger::{Choice, Outbound},
    texts,
};

/// Callback tokens look like `set_currency:UAH`.
pub const TOKEN_PREFIX: &str = "set_currency:";

/// What to show after a button press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurrencyReply {
    /// Edit the picker message into this text.
    Confirmed(String),
    /// Leave the picker in place and show this as a popup.
    Rejected(String),
}

pub struct CurrencySelector {
    store: Arc<dyn Store>,
    allowed: Vec<Currency>,
}

impl CurrencySelector {
    pub fn new(store: Arc<dyn Store>, allowed: Vec<Currency>) -> Self {
        Self { store, allowed }
    }

    pub fn allowed(&self) -> &[Currency] {
        &self.allowed
    }

    /// Extracts the code from a callback token; `None` for foreign tokens.
    pub fn parse_token(data: &str) -> Option<&str> {
        data.strip_prefix(TOKEN_PREFIX)
    }

    /// One button per allowed currency, in configured order.
    pub fn keyboard(&self, prompt: &str) -> Outbound {
        let choices = self
            .allowed
            .iter()
            .map(|currency| Choice {
                label: currency.code().to_string(),
                token: format!("{TOKEN_PREFIX}{}", currency.code()),
            })
            .collect();
        Outbound::Choice {
            text: prompt.to_string(),
            choices,
        }
    }

    pub async fn handle_selection(&self, user: UserIdentity, code: &str) -> CurrencyReply {
        let Some(currency) = self.allowed.iter().find(|c| c.code() == code) else {
            tracing::warn!(user = %user, "rejected currency code {code:?}");
            return CurrencyReply::Rejected(texts::INVALID_CURRENCY.to_string());
        };

        match self.store.set_currency(user, currency).await {
            Ok(()) => {
                tracing::info!(user = %user, "currency set to {currency}");
                CurrencyReply::Confirmed(texts::CURRENCY_SAVED.to_string())
            }
            Err(err) => {
                tracing::error!(user = %user, "failed to save currency: {err}");
                CurrencyReply::Rejected(texts::GENERIC_ERROR.to_string())
            }
        }
    }
}
