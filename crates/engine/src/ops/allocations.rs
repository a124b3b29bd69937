use sea_orm::{
    ActiveValue, DatabaseTransaction, JoinType, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{
    AccountSnapshot, Allocation, AllocationKind, BudgetSnapshot, EngineError, Money, ResultEngine,
    accounts, allocations,
};

use super::{Engine, with_tx};

/// What an `update_allocation` call actually did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationChange {
    /// Neither kind nor balance differed; nothing was written.
    NoOp,
    /// Only the balance was overwritten.
    BalanceOnly,
    /// The kind changed in place; no other row held the requested kind.
    Relabelled,
    /// Kind, balance and account were exchanged with the row that held the
    /// requested kind (possibly on another account).
    Swapped { counterpart_id: i32 },
}

/// Result of `update_allocation`.
#[derive(Clone, Debug)]
pub struct AllocationWrite {
    pub change: AllocationChange,
    /// Post-state of the allocation the caller addressed.
    pub allocation: Allocation,
    pub accounts: Vec<AccountSnapshot>,
    pub budget: Option<BudgetSnapshot>,
}

/// Result of `update_account_balance`.
#[derive(Clone, Debug)]
pub struct BalanceWrite {
    pub allocation: Allocation,
    pub account_balance: Money,
    pub budget: Option<BudgetSnapshot>,
}

impl Engine {
    /// Reassigns an allocation's kind and/or overwrites its balance.
    ///
    /// Kind changes follow the swap rule: if any of the user's allocations
    /// already holds the requested kind, the two rows exchange kind, balance
    /// **and** account; otherwise the row is relabelled in place. After a
    /// kind change every account balance is recomputed as the plain sum of
    /// its own buckets.
    ///
    /// A balance overwrite recomputes only the owning account, with the
    /// count-sensitive rule.
    pub async fn update_allocation(
        &self,
        user_id: &str,
        allocation_id: i32,
        new_kind: Option<AllocationKind>,
        new_balance: Option<Money>,
    ) -> ResultEngine<AllocationWrite> {
        if new_kind.is_none() && new_balance.is_none() {
            return Err(EngineError::InvalidAmount(
                "nothing to update: pass a kind or a balance".to_string(),
            ));
        }
        if let Some(balance) = new_balance
            && balance.is_negative()
        {
            return Err(EngineError::InvalidAmount(
                "balance must not be negative".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let (target, account) = self
                .require_allocation_owned(&db_tx, allocation_id, user_id)
                .await?;
            let current_kind = AllocationKind::try_from(target.kind.as_str())?;
            let current_balance = Money::new(target.balance);

            let kind_differs = new_kind.is_some_and(|k| k != current_kind);
            let balance_differs = new_balance.is_some_and(|b| b != current_balance);
            if !kind_differs && !balance_differs {
                let accounts = self.snapshot_tx(&db_tx, user_id).await?;
                return Ok(AllocationWrite {
                    change: AllocationChange::NoOp,
                    allocation: Allocation::try_from(target)?,
                    accounts,
                    budget: None,
                });
            }

            let mut change = AllocationChange::NoOp;
            // Post-write location of the caller's allocation; a swap can move
            // it to the counterpart's account.
            let mut target_account_id = target.account_id;
            let mut target_kind = current_kind;
            let mut kebutuhan_touched = current_kind == AllocationKind::Kebutuhan;

            if let Some(requested) = new_kind
                && kind_differs
            {
                kebutuhan_touched |= requested == AllocationKind::Kebutuhan;
                match self
                    .find_user_allocation_of_kind(&db_tx, user_id, requested)
                    .await?
                {
                    Some(counterpart) => {
                        let counterpart_id = counterpart.id;
                        let counterpart_account = counterpart.account_id;
                        let counterpart_balance = counterpart.balance;

                        // The (account_id, kind) pair is unique and enforced
                        // per statement, so the counterpart vacates its slot
                        // before the exchange.
                        let vacated = allocations::ActiveModel {
                            id: ActiveValue::Set(counterpart_id),
                            kind: ActiveValue::Set(format!("swap:{counterpart_id}")),
                            ..Default::default()
                        };
                        vacated.update(&db_tx).await?;

                        let swapped_target = allocations::ActiveModel {
                            id: ActiveValue::Set(target.id),
                            account_id: ActiveValue::Set(counterpart_account),
                            kind: ActiveValue::Set(requested.as_str().to_string()),
                            balance: ActiveValue::Set(counterpart_balance),
                            ..Default::default()
                        };
                        swapped_target.update(&db_tx).await?;

                        let swapped_counterpart = allocations::ActiveModel {
                            id: ActiveValue::Set(counterpart_id),
                            account_id: ActiveValue::Set(target.account_id),
                            kind: ActiveValue::Set(current_kind.as_str().to_string()),
                            balance: ActiveValue::Set(target.balance),
                            ..Default::default()
                        };
                        swapped_counterpart.update(&db_tx).await?;

                        change = AllocationChange::Swapped { counterpart_id };
                        target_account_id = counterpart_account;
                    }
                    None => {
                        let relabelled = allocations::ActiveModel {
                            id: ActiveValue::Set(target.id),
                            kind: ActiveValue::Set(requested.as_str().to_string()),
                            ..Default::default()
                        };
                        relabelled.update(&db_tx).await?;
                        change = AllocationChange::Relabelled;
                    }
                }
                target_kind = requested;

                // Manual reassignment recomputes every account as a plain
                // sum; the count-sensitive exclusions do not apply here.
                self.recompute_all_plain(&db_tx, user_id).await?;
            }

            // Past the no-op gate a provided balance is always written, even
            // when a swap just changed what "current" means for this row.
            if let Some(balance) = new_balance {
                let overwrite = allocations::ActiveModel {
                    id: ActiveValue::Set(target.id),
                    balance: ActiveValue::Set(balance.rupiah()),
                    ..Default::default()
                };
                overwrite.update(&db_tx).await?;
                if change == AllocationChange::NoOp {
                    change = AllocationChange::BalanceOnly;
                }
                kebutuhan_touched |= target_kind == AllocationKind::Kebutuhan;

                self.recompute_account_balance(&db_tx, user_id, target_account_id)
                    .await?;
            }

            let budget = if kebutuhan_touched {
                Some(
                    self.refresh_budget_for_kebutuhan(&db_tx, user_id, account.id)
                        .await,
                )
            } else {
                None
            };

            let updated = allocations::Entity::find_by_id(target.id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::Inconsistent("updated allocation vanished".to_string())
                })?;
            let accounts = self.snapshot_tx(&db_tx, user_id).await?;

            Ok(AllocationWrite {
                change,
                allocation: Allocation::try_from(updated)?,
                accounts,
                budget,
            })
        })
    }

    /// Sets one bucket's balance on an account, creating the allocation row
    /// when the account does not hold that kind yet.
    pub async fn update_account_balance(
        &self,
        user_id: &str,
        account_id: i32,
        kind: AllocationKind,
        balance: Money,
    ) -> ResultEngine<BalanceWrite> {
        if balance.is_negative() {
            return Err(EngineError::InvalidAmount(
                "balance must not be negative".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_account_owned(&db_tx, account_id, user_id)
                .await?;

            let existing = allocations::Entity::find()
                .filter(allocations::Column::AccountId.eq(account_id))
                .filter(allocations::Column::Kind.eq(kind.as_str()))
                .one(&db_tx)
                .await?;

            let today = self.today();
            let written = match existing {
                Some(row) => {
                    let mut active: allocations::ActiveModel = row.into();
                    active.balance = ActiveValue::Set(balance.rupiah());
                    active.allocation_date = ActiveValue::Set(today);
                    active.update(&db_tx).await?
                }
                None => {
                    allocations::ActiveModel {
                        id: ActiveValue::NotSet,
                        account_id: ActiveValue::Set(account_id),
                        kind: ActiveValue::Set(kind.as_str().to_string()),
                        balance: ActiveValue::Set(balance.rupiah()),
                        allocation_date: ActiveValue::Set(today),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };

            let account_balance = self
                .recompute_account_balance(&db_tx, user_id, account_id)
                .await?;

            let budget = if kind == AllocationKind::Kebutuhan {
                Some(
                    self.refresh_daily_budget(&db_tx, user_id, account_id, balance)
                        .await,
                )
            } else {
                None
            };

            Ok(BalanceWrite {
                allocation: Allocation::try_from(written)?,
                account_balance,
                budget,
            })
        })
    }

    /// First allocation of the user holding `kind`, scanning accounts oldest
    /// first so the swap counterpart is deterministic.
    async fn find_user_allocation_of_kind(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        kind: AllocationKind,
    ) -> ResultEngine<Option<allocations::Model>> {
        allocations::Entity::find()
            .join(JoinType::InnerJoin, allocations::Relation::Accounts.def())
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(allocations::Column::Kind.eq(kind.as_str()))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .order_by_asc(allocations::Column::Id)
            .limit(1)
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Runs the daily-budget refresh against whichever account holds the
    /// user's Kebutuhan bucket after a kind change. Falls back to
    /// `fallback_account` (with a zero base) when the relabel removed the
    /// last Kebutuhan row.
    async fn refresh_budget_for_kebutuhan(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        fallback_account: i32,
    ) -> BudgetSnapshot {
        let holder = self
            .find_user_allocation_of_kind(db, user_id, AllocationKind::Kebutuhan)
            .await;
        match holder {
            Ok(Some(row)) => {
                self.refresh_daily_budget(db, user_id, row.account_id, Money::new(row.balance))
                    .await
            }
            Ok(None) => {
                self.refresh_daily_budget(db, user_id, fallback_account, Money::ZERO)
                    .await
            }
            Err(err) => {
                tracing::warn!(user = user_id, "kebutuhan lookup failed: {err}");
                BudgetSnapshot::degraded(fallback_account, self.today())
            }
        }
    }
}
