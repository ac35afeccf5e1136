//! In-memory fakes for the `Store` and `Messenger` seams.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine::{BudgetStatus, Currency, EngineError, Money, Store, UserIdentity};

use crate::messenger::{Choice, Messenger, MessengerError, Outbound};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    CreateUser,
    SetCurrency,
    SetMonthlyBudget,
    RecordExpense,
    MonthToDateTotal,
    MonthlyBudget,
    ListUsers,
    RecordNotification,
}

#[derive(Clone, Debug)]
pub(crate) struct FakeUser {
    id: i32,
    currency: Option<Currency>,
    budget: Money,
    last_notified_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecordedExpense {
    pub user_id: i32,
    pub amount: Money,
    pub category: String,
    pub note: String,
}

#[derive(Default)]
struct Data {
    users: HashMap<UserIdentity, FakeUser>,
    expenses: Vec<RecordedExpense>,
    failing: HashSet<Op>,
    delays: HashMap<Op, Duration>,
    failing_status: HashSet<UserIdentity>,
    status_queries: Vec<DateTime<Utc>>,
}

/// Every expense counts as month-to-date, whatever instant is asked about.
#[derive(Default)]
pub(crate) struct FakeStore {
    data: Mutex<Data>,
}

impl FakeStore {
    pub fn register(&self, identity: UserIdentity) {
        let mut data = self.data.lock().unwrap();
        let id = data.users.len() as i32 + 1;
        data.users.entry(identity).or_insert(FakeUser {
            id,
            currency: None,
            budget: Money::ZERO,
            last_notified_at: DateTime::<Utc>::UNIX_EPOCH,
        });
    }

    pub fn fail(&self, op: Op) {
        self.data.lock().unwrap().failing.insert(op);
    }

    /// Makes `op` sleep for `by` before it runs.
    pub fn delay(&self, op: Op, by: Duration) {
        self.data.lock().unwrap().delays.insert(op, by);
    }

    pub fn fail_status_for(&self, identity: UserIdentity) {
        self.data.lock().unwrap().failing_status.insert(identity);
    }

    pub fn set_budget(&self, identity: UserIdentity, budget: Money) {
        self.with_user(identity, |user| user.budget = budget);
    }

    pub fn set_last_notified(&self, identity: UserIdentity, at: DateTime<Utc>) {
        self.with_user(identity, |user| user.last_notified_at = at);
    }

    pub fn seed_expense(&self, identity: UserIdentity, amount: Money) {
        let mut data = self.data.lock().unwrap();
        let user_id = data.users[&identity].id;
        data.expenses.push(RecordedExpense {
            user_id,
            amount,
            category: "seed".to_string(),
            note: String::new(),
        });
    }

    pub fn budget(&self, identity: UserIdentity) -> Money {
        self.data.lock().unwrap().users[&identity].budget
    }

    pub fn currency(&self, identity: UserIdentity) -> Option<Currency> {
        self.data.lock().unwrap().users[&identity].currency.clone()
    }

    pub fn last_notified(&self, identity: UserIdentity) -> DateTime<Utc> {
        self.data.lock().unwrap().users[&identity].last_notified_at
    }

    /// Instants passed to `budget_status`, in call order.
    pub fn status_queries(&self) -> Vec<DateTime<Utc>> {
        self.data.lock().unwrap().status_queries.clone()
    }

    pub fn expenses(&self) -> Vec<RecordedExpense> {
        self.data.lock().unwrap().expenses.clone()
    }

    fn with_user(&self, identity: UserIdentity, f: impl FnOnce(&mut FakeUser)) {
        let mut data = self.data.lock().unwrap();
        f(data.users.get_mut(&identity).unwrap());
    }

    fn check(&self, op: Op) -> Result<(), EngineError> {
        if self.data.lock().unwrap().failing.contains(&op) {
            return Err(EngineError::KeyNotFound(format!("injected failure: {op:?}")));
        }
        Ok(())
    }

    async fn slow_check(&self, op: Op) -> Result<(), EngineError> {
        let delay = self.data.lock().unwrap().delays.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check(op)
    }

    fn update(
        &self,
        identity: UserIdentity,
        f: impl FnOnce(&mut FakeUser),
    ) -> Result<(), EngineError> {
        let mut data = self.data.lock().unwrap();
        let user = data
            .users
            .get_mut(&identity)
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {identity}")))?;
        f(user);
        Ok(())
    }

    fn total(&self, user_id: i32) -> Money {
        let data = self.data.lock().unwrap();
        data.expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .fold(Money::ZERO, |acc, e| acc + e.amount)
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn create_user_if_absent(&self, identity: UserIdentity) -> Result<(), EngineError> {
        self.check(Op::CreateUser)?;
        self.register(identity);
        Ok(())
    }

    async fn set_currency(
        &self,
        identity: UserIdentity,
        currency: &Currency,
    ) -> Result<(), EngineError> {
        self.check(Op::SetCurrency)?;
        self.update(identity, |user| user.currency = Some(currency.clone()))
    }

    async fn set_monthly_budget(
        &self,
        identity: UserIdentity,
        amount: Money,
    ) -> Result<(), EngineError> {
        self.slow_check(Op::SetMonthlyBudget).await?;
        self.update(identity, |user| user.budget = amount)
    }

    async fn resolve_internal_user_id(&self, identity: UserIdentity) -> Result<i32, EngineError> {
        let data = self.data.lock().unwrap();
        data.users
            .get(&identity)
            .map(|user| user.id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {identity}")))
    }

    async fn record_expense(
        &self,
        user_id: i32,
        amount: Money,
        category: &str,
        note: &str,
    ) -> Result<(), EngineError> {
        self.slow_check(Op::RecordExpense).await?;
        self.data.lock().unwrap().expenses.push(RecordedExpense {
            user_id,
            amount,
            category: category.to_string(),
            note: note.to_string(),
        });
        Ok(())
    }

    async fn month_to_date_expense_total(&self, user_id: i32) -> Result<Money, EngineError> {
        self.check(Op::MonthToDateTotal)?;
        Ok(self.total(user_id))
    }

    async fn monthly_budget(&self, identity: UserIdentity) -> Result<Money, EngineError> {
        self.check(Op::MonthlyBudget)?;
        let data = self.data.lock().unwrap();
        data.users
            .get(&identity)
            .map(|user| user.budget)
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {identity}")))
    }

    async fn users_with_positive_budget(&self) -> Result<Vec<UserIdentity>, EngineError> {
        self.check(Op::ListUsers)?;
        let data = self.data.lock().unwrap();
        let mut users: Vec<_> = data
            .users
            .iter()
            .filter(|(_, user)| user.budget.is_positive())
            .map(|(identity, _)| *identity)
            .collect();
        users.sort();
        Ok(users)
    }

    async fn budget_status(
        &self,
        identity: UserIdentity,
        at: DateTime<Utc>,
    ) -> Result<BudgetStatus, EngineError> {
        let user = {
            let mut data = self.data.lock().unwrap();
            data.status_queries.push(at);
            if data.failing_status.contains(&identity) {
                return Err(EngineError::KeyNotFound(format!("status of {identity}")));
            }
            data.users
                .get(&identity)
                .cloned()
                .ok_or_else(|| EngineError::KeyNotFound(format!("user {identity}")))?
        };
        let spent = self.total(user.id);
        let percent_spent = spent
            .percent_of(user.budget)
            .ok_or_else(|| EngineError::InvalidAmount("no budget".to_string()))?;
        Ok(BudgetStatus {
            remaining: user.budget - spent,
            percent_spent,
            last_notified_at: user.last_notified_at,
        })
    }

    async fn record_notification_sent(
        &self,
        identity: UserIdentity,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.check(Op::RecordNotification)?;
        self.update(identity, |user| user.last_notified_at = at)
    }
}

/// Records every delivery; sends to users in `unreachable` fail.
#[derive(Default)]
pub(crate) struct RecordingMessenger {
    sent: Mutex<Vec<(UserIdentity, Outbound)>>,
    unreachable: Mutex<HashSet<UserIdentity>>,
}

impl RecordingMessenger {
    pub fn make_unreachable(&self, user: UserIdentity) {
        self.unreachable.lock().unwrap().insert(user);
    }

    pub fn sent(&self) -> Vec<(UserIdentity, Outbound)> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, to: UserIdentity, message: Outbound) -> Result<(), MessengerError> {
        if self.unreachable.lock().unwrap().contains(&to) {
            return Err(MessengerError::Unreachable(to));
        }
        self.sent.lock().unwrap().push((to, message));
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, to: UserIdentity, text: &str) -> Result<(), MessengerError> {
        self.push(to, Outbound::text(text))
    }

    async fn send_choice(
        &self,
        to: UserIdentity,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError> {
        self.push(
            to,
            Outbound::Choice {
                text: text.to_string(),
                choices: choices.to_vec(),
            },
        )
    }
}
