//! Daily budget rows.
//!
//! One logical row per (user, account, calendar day). `daily_budget` starts
//! equal to `initial_daily_budget` and only decreases as expenses are
//! recorded; `daily_saving` accumulates yesterday's unspent allowance day
//! over day.

use chrono::NaiveDate;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;

use crate::Money;

/// The budget figures returned to callers after a recompute or lookup.
///
/// `degraded` marks a snapshot produced after the recalculation itself
/// failed: all figures are zero and the triggering mutation was **not**
/// rolled back. Callers must treat it as "tracking degraded, not fatal".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetSnapshot {
    pub account_id: i32,
    pub date: NaiveDate,
    pub daily_budget: i64,
    pub initial_daily_budget: i64,
    pub daily_saving: i64,
    pub degraded: bool,
}

impl BudgetSnapshot {
    /// The zeroed marker snapshot for a failed recomputation.
    #[must_use]
    pub fn degraded(account_id: i32, date: NaiveDate) -> Self {
        Self {
            account_id,
            date,
            daily_budget: 0,
            initial_daily_budget: 0,
            daily_saving: 0,
            degraded: true,
        }
    }

    pub(crate) fn from_model(model: &Model) -> Self {
        Self {
            account_id: model.account_id,
            date: model.budget_date,
            daily_budget: model.daily_budget,
            initial_daily_budget: model.initial_daily_budget,
            daily_saving: model.daily_saving,
            degraded: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub account_id: i32,
    pub daily_budget: i64,
    pub initial_daily_budget: i64,
    pub daily_saving: i64,
    pub budget_date: Date,
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

pub(crate) fn new_budget(
    user_id: &str,
    account_id: i32,
    date: NaiveDate,
    daily_budget: Money,
    daily_saving: Money,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id.to_string()),
        account_id: ActiveValue::Set(account_id),
        daily_budget: ActiveValue::Set(daily_budget.rupiah()),
        initial_daily_budget: ActiveValue::Set(daily_budget.rupiah()),
        daily_saving: ActiveValue::Set(daily_saving.rupiah()),
        budget_date: ActiveValue::Set(date),
    }
}
