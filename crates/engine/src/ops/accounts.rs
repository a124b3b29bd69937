use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    AccountSnapshot, Allocation, AllocationKind, BudgetSnapshot, EngineError, Money, ResultEngine,
    allocations,
    rebalance::{advisory_message, transition_plan},
};

use super::{Engine, with_tx};

/// Everything a caller learns from a successful account creation.
#[derive(Clone, Debug)]
pub struct AccountCreated {
    pub account: AccountSnapshot,
    pub total_accounts: usize,
    /// Advisory one-liner keyed on the resulting account count. Not stored.
    pub message: String,
    pub accounts: Vec<AccountSnapshot>,
    /// Present only when this creation funded a Kebutuhan bucket.
    pub budget: Option<BudgetSnapshot>,
}

/// A user's full accounts/allocations view, chronologically ordered.
#[derive(Clone, Debug)]
pub struct AccountsSnapshot {
    pub accounts: Vec<AccountSnapshot>,
}

impl Engine {
    /// Attaches a new bank account, redistributing buckets according to the
    /// account-count state machine.
    ///
    /// The whole operation is one transaction: a policy rejection or a
    /// missing expected allocation leaves the tables untouched.
    pub async fn add_account(
        &self,
        user_id: &str,
        bank_id: i32,
        kind: AllocationKind,
        balance: Money,
    ) -> ResultEngine<AccountCreated> {
        if balance.is_negative() {
            return Err(EngineError::InvalidAmount(
                "balance must not be negative".to_string(),
            ));
        }
        let created_at = Utc::now();

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            self.require_bank(&db_tx, bank_id).await?;

            let existing = self.ordered_accounts(&db_tx, user_id).await?;
            let plan = transition_plan(existing.len(), kind)?;

            if let Some((ordinal, kinds)) = &plan.strip {
                let demoted = existing.get(*ordinal).ok_or_else(|| {
                    EngineError::Inconsistent("account ordering shorter than expected".to_string())
                })?;
                for stripped in kinds {
                    let row = allocations::Entity::find()
                        .filter(allocations::Column::AccountId.eq(demoted.id))
                        .filter(allocations::Column::Kind.eq(stripped.as_str()))
                        .one(&db_tx)
                        .await?
                        .ok_or_else(|| {
                            EngineError::Inconsistent(format!(
                                "expected {stripped} allocation missing on account {}",
                                demoted.id
                            ))
                        })?;
                    row.delete(&db_tx).await?;
                }
            }

            let account = crate::accounts::new_account(user_id, bank_id, balance, created_at)
                .insert(&db_tx)
                .await?;

            let today = self.today();
            let mut funded_kebutuhan = None;
            for planned in &plan.create {
                let amount = if planned.funded { balance } else { Money::ZERO };
                allocations::ActiveModel {
                    id: ActiveValue::NotSet,
                    account_id: ActiveValue::Set(account.id),
                    kind: ActiveValue::Set(planned.kind.as_str().to_string()),
                    balance: ActiveValue::Set(amount.rupiah()),
                    allocation_date: ActiveValue::Set(today),
                }
                .insert(&db_tx)
                .await?;
                if planned.kind == AllocationKind::Kebutuhan && planned.funded {
                    funded_kebutuhan = Some(amount);
                }
            }

            // Positions shift for every account when the count changes, so
            // all balances are recomputed, not just the new account's.
            self.recompute_all_positional(&db_tx, user_id).await?;

            let budget = match funded_kebutuhan {
                Some(amount) => Some(
                    self.refresh_daily_budget(&db_tx, user_id, account.id, amount)
                        .await,
                ),
                None => None,
            };

            let accounts = self.snapshot_tx(&db_tx, user_id).await?;
            let total_accounts = accounts.len();
            let created = accounts
                .iter()
                .find(|a| a.id == account.id)
                .cloned()
                .ok_or_else(|| {
                    EngineError::Inconsistent("created account missing from snapshot".to_string())
                })?;

            Ok(AccountCreated {
                account: created,
                total_accounts,
                message: advisory_message(total_accounts).to_string(),
                accounts,
                budget,
            })
        })
    }

    /// The user's accounts with their allocations, oldest first.
    pub async fn accounts_snapshot(&self, user_id: &str) -> ResultEngine<AccountsSnapshot> {
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            let accounts = self.snapshot_tx(&db_tx, user_id).await?;
            Ok(AccountsSnapshot { accounts })
        })
    }

    pub(super) async fn snapshot_tx(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<AccountSnapshot>> {
        let ordered = self.ordered_accounts(db, user_id).await?;
        let mut out = Vec::with_capacity(ordered.len());
        for model in ordered {
            let bank = self.require_bank(db, model.bank_id).await?;
            let allocations = self
                .allocations_of_account(db, model.id)
                .await?
                .into_iter()
                .map(Allocation::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            out.push(AccountSnapshot {
                id: model.id,
                bank_id: model.bank_id,
                bank_name: bank.name,
                initial_balance: Money::new(model.initial_balance),
                current_balance: Money::new(model.current_balance),
                created_at: model.created_at,
                allocations,
            });
        }
        Ok(out)
    }
}
