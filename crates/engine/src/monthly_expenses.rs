//! Recurring monthly obligations (rent, subscriptions).
//!
//! The sum of a user's active rows is subtracted from the Kebutuhan balance
//! before it is divided across the days of the month.

use sea_orm::entity::{ActiveValue, prelude::*};

use crate::Money;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "monthly_expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub name: String,
    pub amount: i64,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn new_monthly_expense(user_id: &str, name: &str, amount: Money) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id.to_string()),
        name: ActiveValue::Set(name.to_string()),
        amount: ActiveValue::Set(amount.rupiah()),
        active: ActiveValue::Set(true),
    }
}
