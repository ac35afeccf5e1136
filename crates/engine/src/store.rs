//! Data-access contract the bot depends on.
//!
//! The conversation engine and the budget monitor only ever talk to a
//! [`Store`]; [`Engine`](crate::Engine) is the sea-orm implementation, tests
//! use in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Currency, Money, ResultEngine};

/// External platform user id (the Telegram user id).
///
/// Distinct from the internal row id returned by
/// [`Store::resolve_internal_user_id`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserIdentity(pub i64);

impl core::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot used by the budget monitor.
#[derive(Clone, Debug, PartialEq)]
pub struct BudgetStatus {
    /// Budget minus month-to-date expenses; negative when overspent.
    pub remaining: Money,
    /// Month-to-date expenses over budget, in percent.
    pub percent_spent: f64,
    pub last_notified_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Registers the user; a no-op when the identity is already known.
    async fn create_user_if_absent(&self, identity: UserIdentity) -> ResultEngine<()>;

    async fn set_currency(&self, identity: UserIdentity, currency: &Currency) -> ResultEngine<()>;

    async fn set_monthly_budget(&self, identity: UserIdentity, amount: Money) -> ResultEngine<()>;

    /// Fails with `KeyNotFound` when the identity never registered.
    async fn resolve_internal_user_id(&self, identity: UserIdentity) -> ResultEngine<i32>;

    async fn record_expense(
        &self,
        user_id: i32,
        amount: Money,
        category: &str,
        note: &str,
    ) -> ResultEngine<()>;

    async fn month_to_date_expense_total(&self, user_id: i32) -> ResultEngine<Money>;

    /// Returns [`Money::ZERO`] when no budget is set.
    async fn monthly_budget(&self, identity: UserIdentity) -> ResultEngine<Money>;

    async fn users_with_positive_budget(&self) -> ResultEngine<Vec<UserIdentity>>;

    /// Spending against the budget over the calendar month containing `at`.
    ///
    /// Fails with `InvalidAmount` when the user has no positive budget.
    async fn budget_status(
        &self,
        identity: UserIdentity,
        at: DateTime<Utc>,
    ) -> ResultEngine<BudgetStatus>;

    async fn record_notification_sent(
        &self,
        identity: UserIdentity,
        at: DateTime<Utc>,
    ) -> ResultEngine<()>;
}
