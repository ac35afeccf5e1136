//! Users table.
//!
//! A row is created the first time a Telegram user sends `/start`. The
//! internal `id` is what expenses reference; `telegram_id` is the external
//! identity every conversation is keyed by.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{Currency, EngineError, Money, UserIdentity};

/// A registered user as the rest of the workspace sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i32,
    pub identity: UserIdentity,
    pub currency: Option<Currency>,
    pub monthly_budget: Money,
    pub last_notified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub telegram_id: i64,
    pub currency: Option<String>,
    /// Monthly budget in minor units, `0` when unset.
    pub monthly_budget_minor: i64,
    pub last_notified_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            identity: UserIdentity(model.telegram_id),
            currency: model.currency.as_deref().map(Currency::try_from).transpose()?,
            monthly_budget: Money::new(model.monthly_budget_minor),
            last_notified_at: model.last_notified_at,
            created_at: model.created_at,
        })
    }
}
