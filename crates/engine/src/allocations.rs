//! Budget-bucket allocations attached to an account.
//!
//! Every account splits its balance into up to three buckets:
//!
//! - `Kebutuhan`: day-to-day needs, the base of the daily budget
//! - `Tabungan`: savings
//! - `Darurat`: emergency fund
//!
//! Which buckets live on which account is decided by the rebalancing policy
//! (see [`crate::rebalance`]), not by the caller.

use chrono::NaiveDate;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money};

/// A closed set of bucket kinds. The database stores the wire form as a
/// string column; parsing is case-sensitive and validated at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationKind {
    Kebutuhan,
    Tabungan,
    Darurat,
}

impl AllocationKind {
    pub const ALL: [AllocationKind; 3] = [Self::Kebutuhan, Self::Tabungan, Self::Darurat];

    /// Canonical wire/database form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kebutuhan => "Kebutuhan",
            Self::Tabungan => "Tabungan",
            Self::Darurat => "Darurat",
        }
    }

    /// The other member of the {Tabungan, Darurat} pair.
    ///
    /// Only meaningful for the 1 → 2 account transition, where the new
    /// account receives the requested kind plus this counterpart at zero.
    #[must_use]
    pub const fn savings_counterpart(self) -> Option<AllocationKind> {
        match self {
            Self::Tabungan => Some(Self::Darurat),
            Self::Darurat => Some(Self::Tabungan),
            Self::Kebutuhan => None,
        }
    }
}

impl core::fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AllocationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Kebutuhan" => Ok(Self::Kebutuhan),
            "Tabungan" => Ok(Self::Tabungan),
            "Darurat" => Ok(Self::Darurat),
            other => Err(EngineError::InvalidKind(other.to_string())),
        }
    }
}

/// An allocation row as the rest of the engine sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub id: i32,
    pub account_id: i32,
    pub kind: AllocationKind,
    pub balance: Money,
    pub allocation_date: NaiveDate,
}

impl TryFrom<Model> for Allocation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            kind: AllocationKind::try_from(model.kind.as_str())?,
            balance: Money::new(model.balance),
            allocation_date: model.allocation_date,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "account_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub kind: String,
    pub balance: i64,
    pub allocation_date: Date,
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

impl From<&Allocation> for ActiveModel {
    fn from(value: &Allocation) -> Self {
        Self {
            id: ActiveValue::NotSet,
            account_id: ActiveValue::Set(value.account_id),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            balance: ActiveValue::Set(value.balance.rupiah()),
            allocation_date: ActiveValue::Set(value.allocation_date),
        }
    }
}
