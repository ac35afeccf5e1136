use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Statement, Value,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

pub use calendar::{month_bounds, month_start, same_month};
pub use currency::Currency;
pub use error::EngineError;
pub use money::Money;
pub use store::{BudgetStatus, Store, UserIdentity};
pub use users::User;

mod calendar;
mod currency;
mod error;
mod expenses;
mod money;
mod store;
mod users;

type ResultEngine<T> = Result<T, EngineError>;

/// sea-orm backed [`Store`].
///
/// Month-to-date figures are computed against the calendar of `timezone`.
#[derive(Clone, Debug)]
pub struct Engine {
    database: DatabaseConnection,
    timezone: Tz,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Look up a registered user by external identity.
    pub async fn user(&self, identity: UserIdentity) -> ResultEngine<User> {
        User::try_from(self.user_model(identity).await?)
    }

    /// Persist an expense with an explicit creation time.
    pub async fn record_expense_at(
        &self,
        user_id: i32,
        amount: Money,
        category: &str,
        note: &str,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense amount must be > 0".to_string(),
            ));
        }
        if category.trim().is_empty() {
            return Err(EngineError::InvalidCategory(
                "expense category must not be empty".to_string(),
            ));
        }

        let expense = expenses::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            amount_minor: ActiveValue::Set(amount.minor()),
            category: ActiveValue::Set(category.to_string()),
            note: ActiveValue::Set(note.to_string()),
            created_at: ActiveValue::Set(created_at),
            ..Default::default()
        };
        expenses::Entity::insert(expense)
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Sum of the user's expenses created in `[from, until)`.
    pub async fn expense_total_between(
        &self,
        user_id: i32,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> ResultEngine<Money> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM expenses \
             WHERE user_id = ? AND created_at >= ? AND created_at < ?",
            vec![user_id.into(), from.into(), until.into()],
        );
        let row = self.database.query_one(stmt).await?;
        let total: i64 = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
        Ok(Money::new(total))
    }

    async fn user_model(&self, identity: UserIdentity) -> ResultEngine<users::Model> {
        users::Entity::find()
            .filter(users::Column::TelegramId.eq(identity.0))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {identity}")))
    }

    async fn update_user(
        &self,
        identity: UserIdentity,
        column: users::Column,
        value: Value,
    ) -> ResultEngine<()> {
        let result = users::Entity::update_many()
            .col_expr(column, Expr::value(value))
            .filter(users::Column::TelegramId.eq(identity.0))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("user {identity}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for Engine {
    async fn create_user_if_absent(&self, identity: UserIdentity) -> ResultEngine<()> {
        let user = users::ActiveModel {
            telegram_id: ActiveValue::Set(identity.0),
            currency: ActiveValue::Set(None),
            monthly_budget_minor: ActiveValue::Set(0),
            last_notified_at: ActiveValue::Set(DateTime::<Utc>::UNIX_EPOCH),
            created_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        };
        users::Entity::insert(user)
            .on_conflict(
                OnConflict::column(users::Column::TelegramId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }

    async fn set_currency(&self, identity: UserIdentity, currency: &Currency) -> ResultEngine<()> {
        self.update_user(
            identity,
            users::Column::Currency,
            currency.code().to_string().into(),
        )
        .await
    }

    async fn set_monthly_budget(&self, identity: UserIdentity, amount: Money) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "monthly budget must be > 0".to_string(),
            ));
        }
        self.update_user(
            identity,
            users::Column::MonthlyBudgetMinor,
            amount.minor().into(),
        )
        .await
    }

    async fn resolve_internal_user_id(&self, identity: UserIdentity) -> ResultEngine<i32> {
        Ok(self.user_model(identity).await?.id)
    }

    async fn record_expense(
        &self,
        user_id: i32,
        amount: Money,
        category: &str,
        note: &str,
    ) -> ResultEngine<()> {
        self.record_expense_at(user_id, amount, category, note, Utc::now())
            .await
    }

    async fn month_to_date_expense_total(&self, user_id: i32) -> ResultEngine<Money> {
        let (from, until) = month_bounds(Utc::now(), self.timezone);
        self.expense_total_between(user_id, from, until).await
    }

    async fn monthly_budget(&self, identity: UserIdentity) -> ResultEngine<Money> {
        Ok(Money::new(self.user_model(identity).await?.monthly_budget_minor))
    }

    async fn users_with_positive_budget(&self) -> ResultEngine<Vec<UserIdentity>> {
        let users = users::Entity::find()
            .filter(users::Column::MonthlyBudgetMinor.gt(0))
            .all(&self.database)
            .await?;
        Ok(users
            .into_iter()
            .map(|u| UserIdentity(u.telegram_id))
            .collect())
    }

    async fn budget_status(
        &self,
        identity: UserIdentity,
        at: DateTime<Utc>,
    ) -> ResultEngine<BudgetStatus> {
        let user = self.user_model(identity).await?;
        let budget = Money::new(user.monthly_budget_minor);
        let (from, until) = month_bounds(at, self.timezone);
        let spent = self.expense_total_between(user.id, from, until).await?;
        let percent_spent = spent.percent_of(budget).ok_or_else(|| {
            EngineError::InvalidAmount(format!("user {identity} has no monthly budget"))
        })?;

        Ok(BudgetStatus {
            remaining: budget - spent,
            percent_spent,
            last_notified_at: user.last_notified_at,
        })
    }

    async fn record_notification_sent(
        &self,
        identity: UserIdentity,
        at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        self.update_user(identity, users::Column::LastNotifiedAt, at.into())
            .await
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    timezone: Option<Tz>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Time zone used for calendar months. Defaults to UTC.
    pub fn timezone(mut self, tz: Tz) -> EngineBuilder {
        self.timezone = Some(tz);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            timezone: self.timezone.unwrap_or(chrono_tz::UTC),
        }
    }
}
