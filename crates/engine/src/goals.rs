//! Savings goals.
//!
//! Goals are a read-only consumer of allocation balances: progress is the
//! user's Tabungan total measured against the goal target. They never
//! participate in the rebalancing transaction.

use sea_orm::entity::{ActiveValue, prelude::*};

use crate::Money;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub name: String,
    pub target: i64,
    pub created_at: DateTimeUtc,
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

pub(crate) fn new_goal(
    user_id: &str,
    name: &str,
    target: Money,
    created_at: sea_orm::prelude::DateTimeUtc,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id.to_string()),
        name: ActiveValue::Set(name.to_string()),
        target: ActiveValue::Set(target.rupiah()),
        created_at: ActiveValue::Set(created_at),
    }
}
