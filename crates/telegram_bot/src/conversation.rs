//! Multi-step flows: setting the monthly budget and adding an expense.
//!
//! Every inbound text is routed through the user's current [`FlowState`].
//! Each state has its own transition function returning a [`Step`], the next
//! state plus the reply to send. Input mistakes keep the state and re-prompt;
//! any store failure abandons the flow so the user can never get stuck.

use std::sync::Arc;

use engine::{EngineError, Money, Store, UserIdentity};

use crate::{
    messenger::{Messenger, MessengerError, Outbound},
    parsing::{parse_amount, parse_category, parse_note},
    state::{ExpenseDraft, FlowState, FlowStore, Versioned},
    texts,
};

/// Result of feeding one text to a flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub next: FlowState,
    pub reply: Option<Outbound>,
}

impl Step {
    fn to(next: FlowState, reply: impl Into<String>) -> Self {
        Self {
            next,
            reply: Some(Outbound::text(reply)),
        }
    }

    fn finish(reply: impl Into<String>) -> Self {
        Self::to(FlowState::Idle, reply)
    }
}

pub struct ConversationEngine {
    store: Arc<dyn Store>,
    flows: Arc<dyn FlowStore>,
}

impl ConversationEngine {
    pub fn new(store: Arc<dyn Store>, flows: Arc<dyn FlowStore>) -> Self {
        Self { store, flows }
    }

    /// Starts the budget flow, dropping whatever flow was in progress.
    pub async fn start_budget_flow(&self, user: UserIdentity) -> Outbound {
        self.flows.set(user, FlowState::AwaitingBudgetAmount).await;
        Outbound::text(texts::ASK_BUDGET)
    }

    /// Starts the expense flow with an empty draft, dropping whatever flow
    /// was in progress.
    pub async fn start_expense_flow(&self, user: UserIdentity) -> Outbound {
        self.flows
            .set(user, FlowState::AwaitingExpenseAmount(ExpenseDraft::default()))
            .await;
        Outbound::text(texts::ASK_AMOUNT)
    }

    pub async fn cancel(&self, user: UserIdentity) -> Outbound {
        if self.flows.clear(user).await.is_idle() {
            Outbound::text(texts::NOTHING_TO_CANCEL)
        } else {
            Outbound::text(texts::CANCELLED)
        }
    }

    pub async fn state(&self, user: UserIdentity) -> FlowState {
        self.flows.get(user).await
    }

    /// Advances the user's flow with `text`. Returns nothing when no flow is
    /// active.
    ///
    /// The next state is written only if no other command touched the flow
    /// while this text was processed. A flow started in the meantime wins; the
    /// outcome of a finished flow is still reported.
    pub async fn handle_text(&self, user: UserIdentity, text: &str) -> Vec<Outbound> {
        let Versioned { state, version } = self.flows.load(user).await;
        let step = match state {
            FlowState::Idle => {
                tracing::debug!(user = %user, "ignoring text outside of a flow");
                return Vec::new();
            }
            FlowState::AwaitingBudgetAmount => self.budget_amount(user, text).await,
            FlowState::AwaitingExpenseAmount(draft) => expense_amount(draft, text),
            FlowState::AwaitingExpenseCategory(draft) => expense_category(draft, text),
            FlowState::AwaitingExpenseNote(draft) => self.expense_note(user, draft, text).await,
        };

        let finished = step.next.is_idle();
        if !self.flows.replace(user, version, step.next).await {
            tracing::debug!(user = %user, "flow changed while handling text");
            if !finished {
                return Vec::new();
            }
        }
        step.reply.into_iter().collect()
    }

    /// Sends flow replies in order. A failed send abandons the flow, since
    /// the user never saw the prompt it waits on.
    pub async fn send_replies(
        &self,
        messenger: &dyn Messenger,
        user: UserIdentity,
        replies: Vec<Outbound>,
    ) -> Result<(), MessengerError> {
        for reply in replies {
            if let Err(err) = messenger.deliver(user, &reply).await {
                tracing::error!(user = %user, "failed to send reply: {err}");
                self.flows.clear(user).await;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn budget_amount(&self, user: UserIdentity, text: &str) -> Step {
        let Ok(amount) = parse_amount(text) else {
            return Step::to(FlowState::AwaitingBudgetAmount, texts::INVALID_BUDGET);
        };

        match self.store.set_monthly_budget(user, amount).await {
            Ok(()) => Step::finish(texts::budget_saved(amount)),
            Err(err) => {
                tracing::error!(user = %user, "failed to save monthly budget: {err}");
                Step::finish(texts::BUDGET_SAVE_FAILED)
            }
        }
    }

    async fn expense_note(&self, user: UserIdentity, draft: ExpenseDraft, text: &str) -> Step {
        let draft = ExpenseDraft {
            note: Some(parse_note(text)),
            ..draft
        };
        Step::finish(self.commit_expense(user, draft).await)
    }

    /// Persists a complete draft and builds the confirmation.
    async fn commit_expense(&self, user: UserIdentity, draft: ExpenseDraft) -> String {
        let ExpenseDraft {
            amount: Some(raw_amount),
            category: Some(category),
            note: Some(note),
        } = draft
        else {
            tracing::warn!(user = %user, "expense draft is incomplete");
            return texts::EXPENSE_SAVE_FAILED.to_string();
        };
        let Ok(amount) = parse_amount(&raw_amount) else {
            tracing::warn!(user = %user, "draft amount no longer parses: {raw_amount:?}");
            return texts::EXPENSE_SAVE_FAILED.to_string();
        };

        let user_id = match self.store.resolve_internal_user_id(user).await {
            Ok(id) => id,
            Err(EngineError::KeyNotFound(_)) => {
                tracing::warn!(user = %user, "expense from unregistered user");
                return texts::PROFILE_NOT_FOUND.to_string();
            }
            Err(err) => {
                tracing::error!(user = %user, "failed to resolve user: {err}");
                return texts::PROFILE_NOT_FOUND.to_string();
            }
        };

        if let Err(err) = self
            .store
            .record_expense(user_id, amount, &category, &note)
            .await
        {
            tracing::error!(user = %user, "failed to save expense: {err}");
            return texts::EXPENSE_SAVE_FAILED.to_string();
        }

        let month_total = match self.store.month_to_date_expense_total(user_id).await {
            Ok(total) => total,
            Err(err) => {
                tracing::error!(user = %user, "failed to compute monthly expenses: {err}");
                return texts::TOTAL_FAILED.to_string();
            }
        };

        let mut response = texts::expense_saved(amount, &category, month_total);
        match self.store.monthly_budget(user).await {
            Ok(budget) if budget.is_positive() => {
                let remaining = budget - month_total;
                response.push_str(&texts::remaining_budget(remaining));
                if is_low_balance(remaining, budget) {
                    response.push_str(texts::LOW_BALANCE_WARNING);
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(user = %user, "failed to load monthly budget: {err}"),
        }
        response
    }
}

fn expense_amount(draft: ExpenseDraft, text: &str) -> Step {
    if parse_amount(text).is_err() {
        return Step::to(FlowState::AwaitingExpenseAmount(draft), texts::INVALID_AMOUNT);
    }
    let draft = ExpenseDraft {
        amount: Some(text.to_string()),
        ..draft
    };
    Step::to(FlowState::AwaitingExpenseCategory(draft), texts::ASK_CATEGORY)
}

fn expense_category(draft: ExpenseDraft, text: &str) -> Step {
    let Ok(category) = parse_category(text) else {
        return Step::to(FlowState::AwaitingExpenseCategory(draft), texts::EMPTY_CATEGORY);
    };
    let draft = ExpenseDraft {
        category: Some(category),
        ..draft
    };
    Step::to(FlowState::AwaitingExpenseNote(draft), texts::ask_note())
}

/// Positive and at most a tenth of the budget.
fn is_low_balance(remaining: Money, budget: Money) -> bool {
    remaining.is_positive() && remaining.minor() <= budget.minor() / 10
}
