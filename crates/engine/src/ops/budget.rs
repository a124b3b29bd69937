use chrono_tz::Tz;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    AllocationKind, BudgetSnapshot, Money, ResultEngine, budgets, util::days_in_month,
};

use super::{Engine, with_tx};

/// Calendar timezone used when the settings do not name one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;

impl Engine {
    /// Recomputes the daily budget after a Kebutuhan-affecting mutation.
    ///
    /// This never fails: a recomputation error is logged and collapsed into
    /// a zeroed snapshot with the `degraded` flag set, so the mutation that
    /// triggered it still commits.
    pub(super) async fn refresh_daily_budget(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: i32,
        kebutuhan_balance: Money,
    ) -> BudgetSnapshot {
        match self
            .refresh_daily_budget_strict(db, user_id, account_id, kebutuhan_balance)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(
                    user = user_id,
                    account = account_id,
                    "daily budget recompute failed: {err}"
                );
                BudgetSnapshot::degraded(account_id, self.today())
            }
        }
    }

    async fn refresh_daily_budget_strict(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: i32,
        kebutuhan_balance: Money,
    ) -> ResultEngine<BudgetSnapshot> {
        let today = self.today();
        let days = days_in_month(today);
        let monthly = self.monthly_expense_total_tx(db, user_id).await?;
        let base = kebutuhan_balance.checked_sub(monthly).unwrap_or(Money::ZERO);
        let daily_budget = base.clamp_zero().div_round_half_up(days);

        let existing = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::AccountId.eq(account_id))
            .filter(budgets::Column::BudgetDate.eq(today))
            .one(db)
            .await?;

        if let Some(row) = existing {
            // A same-day re-trigger refreshes the allowance but never
            // forfeits the savings already carried in.
            let daily_saving = row.daily_saving;
            let mut active: budgets::ActiveModel = row.into();
            active.daily_budget = ActiveValue::Set(daily_budget.rupiah());
            active.initial_daily_budget = ActiveValue::Set(daily_budget.rupiah());
            let updated = active.update(db).await?;
            debug_assert_eq!(updated.daily_saving, daily_saving);
            return Ok(BudgetSnapshot::from_model(&updated));
        }

        let carried = match today.pred_opt() {
            Some(yesterday) => {
                let previous = budgets::Entity::find()
                    .filter(budgets::Column::UserId.eq(user_id))
                    .filter(budgets::Column::AccountId.eq(account_id))
                    .filter(budgets::Column::BudgetDate.eq(yesterday))
                    .one(db)
                    .await?;
                match previous {
                    Some(row) => {
                        let spent = self
                            .expense_total_on_tx(db, user_id, account_id, yesterday)
                            .await?;
                        let leftover = (Money::new(row.daily_budget) - spent).clamp_zero();
                        Money::new(row.daily_saving) + leftover
                    }
                    None => Money::ZERO,
                }
            }
            None => Money::ZERO,
        };

        let inserted = budgets::new_budget(user_id, account_id, today, daily_budget, carried)
            .insert(db)
            .await?;
        Ok(BudgetSnapshot::from_model(&inserted))
    }

    /// Today's budget snapshot for one account, computing (and persisting)
    /// it from the account's current Kebutuhan bucket when absent.
    pub async fn daily_budget_today(
        &self,
        user_id: &str,
        account_id: i32,
    ) -> ResultEngine<BudgetSnapshot> {
        with_tx!(self, |db_tx| {
            self.require_account_owned(&db_tx, account_id, user_id)
                .await?;
            let amounts = self.bucket_amounts(&db_tx, account_id).await?;
            let kebutuhan = amounts
                .get(&AllocationKind::Kebutuhan)
                .copied()
                .unwrap_or(Money::ZERO);
            self.refresh_daily_budget_strict(&db_tx, user_id, account_id, kebutuhan)
                .await
        })
    }
}
