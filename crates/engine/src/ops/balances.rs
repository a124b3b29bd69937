use sea_orm::{ActiveValue, DatabaseTransaction, prelude::*};

use crate::{
    AllocationKind, EngineError, Money, ResultEngine, accounts,
    rebalance::{AccountPosition, BucketAmounts, aggregate_balance, plain_sum},
};

use super::Engine;

impl Engine {
    pub(super) async fn bucket_amounts(
        &self,
        db: &DatabaseTransaction,
        account_id: i32,
    ) -> ResultEngine<BucketAmounts> {
        let rows = self.allocations_of_account(db, account_id).await?;
        let mut amounts = BucketAmounts::new();
        for row in rows {
            let kind = AllocationKind::try_from(row.kind.as_str())?;
            amounts.insert(kind, Money::new(row.balance));
        }
        Ok(amounts)
    }

    async fn persist_balance(
        &self,
        db: &DatabaseTransaction,
        account_id: i32,
        balance: Money,
    ) -> ResultEngine<()> {
        let model = accounts::ActiveModel {
            id: ActiveValue::Set(account_id),
            current_balance: ActiveValue::Set(balance.rupiah()),
            ..Default::default()
        };
        model.update(db).await?;
        Ok(())
    }

    /// Recomputes one account's `current_balance` with the count-sensitive
    /// rule, evaluated against the user's current account count and
    /// chronological ordering.
    pub(super) async fn recompute_account_balance(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: i32,
    ) -> ResultEngine<Money> {
        let ordered = self.ordered_accounts(db, user_id).await?;
        let ordinal = ordered
            .iter()
            .position(|a| a.id == account_id)
            .ok_or_else(|| EngineError::Inconsistent("account not in ordering".to_string()))?;
        let position = AccountPosition::classify(ordered.len(), ordinal);
        let amounts = self.bucket_amounts(db, account_id).await?;
        let balance = aggregate_balance(position, &amounts);
        self.persist_balance(db, account_id, balance).await?;
        Ok(balance)
    }

    /// Recomputes every account of the user with the count-sensitive rule.
    /// Used after account-count transitions, where positions shift for
    /// accounts the transition never wrote to.
    pub(super) async fn recompute_all_positional(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<()> {
        let ordered = self.ordered_accounts(db, user_id).await?;
        let total = ordered.len();
        for (ordinal, account) in ordered.iter().enumerate() {
            let position = AccountPosition::classify(total, ordinal);
            let amounts = self.bucket_amounts(db, account.id).await?;
            let balance = aggregate_balance(position, &amounts);
            self.persist_balance(db, account.id, balance).await?;
        }
        Ok(())
    }

    /// Recomputes every account of the user as the plain sum of its own
    /// buckets. This is the rule the manual swap path uses; it intentionally
    /// skips the count-sensitive exclusions.
    pub(super) async fn recompute_all_plain(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<()> {
        let ordered = self.ordered_accounts(db, user_id).await?;
        for account in ordered {
            let amounts = self.bucket_amounts(db, account.id).await?;
            let balance = plain_sum(&amounts);
            self.persist_balance(db, account.id, balance).await?;
        }
        Ok(())
    }
}
