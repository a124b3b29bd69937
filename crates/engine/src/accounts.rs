//! Bank accounts owned by a user.
//!
//! An account is the engine's view of one real bank account or e-wallet.
//! Its `current_balance` is denormalized: after any allocation mutation it is
//! recomputed from the account's allocations by the policy in
//! [`crate::rebalance`], which may exclude buckets depending on how many
//! accounts the user holds.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{Allocation, Money};

/// An account row together with its allocations, ready for responses.
#[derive(Clone, Debug)]
pub struct AccountSnapshot {
    pub id: i32,
    pub bank_id: i32,
    pub bank_name: String,
    pub initial_balance: Money,
    pub current_balance: Money,
    pub created_at: DateTime<Utc>,
    pub allocations: Vec<Allocation>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub bank_id: i32,
    pub initial_balance: i64,
    pub current_balance: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocations::Entity")]
    Allocations,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
    #[sea_orm(
        belongs_to = "super::banks::Entity",
        from = "Column::BankId",
        to = "super::banks::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Banks,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl Related<super::banks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Banks.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Active model for a brand-new account. The id is assigned by the database.
pub(crate) fn new_account(
    user_id: &str,
    bank_id: i32,
    initial_balance: Money,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id.to_string()),
        bank_id: ActiveValue::Set(bank_id),
        initial_balance: ActiveValue::Set(initial_balance.rupiah()),
        current_balance: ActiveValue::Set(0),
        created_at: ActiveValue::Set(created_at),
    }
}
