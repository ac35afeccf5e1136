use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use engine::UserIdentity;
use tokio::sync::Mutex;

/// Raw text captured so far by the expense flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub amount: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
}

/// Where a user is in a multi-step flow.
///
/// The expense draft travels inside the `AwaitingExpense*` variants, so it
/// cannot outlive its flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingBudgetAmount,
    AwaitingExpenseAmount(ExpenseDraft),
    AwaitingExpenseCategory(ExpenseDraft),
    AwaitingExpenseNote(ExpenseDraft),
}

impl FlowState {
    pub fn is_idle(&self) -> bool {
        matches!(self, FlowState::Idle)
    }
}

/// A state together with the version it was written under.
///
/// Every write gives the entry a fresh version. Idle users sit at version 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Versioned {
    pub state: FlowState,
    pub version: u64,
}

/// Per-user flow state table.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Current state and its version, [`FlowState::Idle`] for unknown users.
    async fn load(&self, user: UserIdentity) -> Versioned;

    /// Replaces the state. Setting `Idle` forgets the user.
    async fn set(&self, user: UserIdentity, state: FlowState);

    /// Forgets the user and returns the state that was dropped.
    async fn clear(&self, user: UserIdentity) -> FlowState;

    /// Writes `next` only if the entry is still at `version`. Returns whether
    /// the write happened.
    async fn replace(&self, user: UserIdentity, version: u64, next: FlowState) -> bool;

    async fn get(&self, user: UserIdentity) -> FlowState {
        self.load(user).await.state
    }
}

#[derive(Default)]
struct Table {
    entries: HashMap<UserIdentity, Versioned>,
    last_version: u64,
}

impl Table {
    fn version_of(&self, user: UserIdentity) -> u64 {
        self.entries.get(&user).map_or(0, |entry| entry.version)
    }

    fn write(&mut self, user: UserIdentity, state: FlowState) {
        if state.is_idle() {
            self.entries.remove(&user);
            return;
        }
        self.last_version += 1;
        let version = self.last_version;
        self.entries.insert(user, Versioned { state, version });
    }
}

/// Process-local [`FlowStore`]; lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryFlowStore {
    inner: Arc<Mutex<Table>>,
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn load(&self, user: UserIdentity) -> Versioned {
        let guard = self.inner.lock().await;
        guard.entries.get(&user).cloned().unwrap_or_default()
    }

    async fn set(&self, user: UserIdentity, state: FlowState) {
        self.inner.lock().await.write(user, state);
    }

    async fn clear(&self, user: UserIdentity) -> FlowState {
        let mut guard = self.inner.lock().await;
        guard
            .entries
            .remove(&user)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    async fn replace(&self, user: UserIdentity, version: u64, next: FlowState) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.version_of(user) != version {
            return false;
        }
        guard.write(user, next);
        true
    }
}
