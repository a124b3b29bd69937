//! The expense ledger.
//!
//! Expenses are append-only rows keyed by a UUID. The rebalancing core does
//! not read them directly except for one query: the sum of a day's expenses,
//! which feeds the daily-saving carry-forward.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::Money;

/// A recorded expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    pub account_id: i32,
    pub amount: Money,
    pub category: String,
    pub note: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Model> for Expense {
    type Error = crate::EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&model.id)
            .map_err(|_| crate::EngineError::Inconsistent("invalid expense id".to_string()))?;
        Ok(Self {
            id,
            account_id: model.account_id,
            amount: Money::new(model.amount),
            category: model.category,
            note: model.note,
            spent_on: model.spent_on,
            created_at: model.created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: i32,
    pub amount: i64,
    pub category: String,
    pub note: Option<String>,
    pub spent_on: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn new_expense(
    user_id: &str,
    account_id: i32,
    amount: Money,
    category: &str,
    note: Option<&str>,
    spent_on: NaiveDate,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4().to_string()),
        user_id: ActiveValue::Set(user_id.to_string()),
        account_id: ActiveValue::Set(account_id),
        amount: ActiveValue::Set(amount.rupiah()),
        category: ActiveValue::Set(category.to_string()),
        note: ActiveValue::Set(note.map(ToString::to_string)),
        spent_on: ActiveValue::Set(spent_on),
        created_at: ActiveValue::Set(created_at),
    }
}
