use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    EngineError, ResultEngine, accounts, allocations, banks, users, util::normalize_name,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }

    pub(super) async fn require_bank(
        &self,
        db: &DatabaseTransaction,
        bank_id: i32,
    ) -> ResultEngine<banks::Model> {
        banks::Entity::find_by_id(bank_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("bank not exists".to_string()))
    }

    /// Looks a bank up by user-typed name, tolerating case and accents.
    pub async fn bank_by_name(&self, name: &str) -> ResultEngine<banks::Model> {
        let norm = normalize_name(name);
        banks::Entity::find()
            .filter(banks::Column::NameNorm.eq(norm))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("bank not exists".to_string()))
    }

    /// Fetches an account and verifies ownership.
    ///
    /// A missing row is `KeyNotFound`; a row owned by someone else is
    /// `Forbidden`, never silently treated as absent.
    pub(super) async fn require_account_owned(
        &self,
        db: &DatabaseTransaction,
        account_id: i32,
        user_id: &str,
    ) -> ResultEngine<accounts::Model> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(EngineError::Forbidden(
                "account belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }

    /// Fetches an allocation and verifies that its account belongs to the
    /// caller.
    pub(super) async fn require_allocation_owned(
        &self,
        db: &DatabaseTransaction,
        allocation_id: i32,
        user_id: &str,
    ) -> ResultEngine<(allocations::Model, accounts::Model)> {
        let allocation = allocations::Entity::find_by_id(allocation_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("allocation not exists".to_string()))?;
        let account = accounts::Entity::find_by_id(allocation.account_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::Inconsistent("allocation without account".to_string()))?;
        if account.user_id != user_id {
            return Err(EngineError::Forbidden(
                "allocation belongs to another user".to_string(),
            ));
        }
        Ok((allocation, account))
    }

    /// The user's accounts in chronological order.
    ///
    /// The id tie-break keeps the "Bank A"/"Bank B" classification stable
    /// when two accounts share a creation timestamp.
    pub(super) async fn ordered_accounts(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<accounts::Model>> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn allocations_of_account(
        &self,
        db: &DatabaseTransaction,
        account_id: i32,
    ) -> ResultEngine<Vec<allocations::Model>> {
        allocations::Entity::find()
            .filter(allocations::Column::AccountId.eq(account_id))
            .order_by_asc(allocations::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }
}
