use base64::Engine as _;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    AllocationKind, BudgetSnapshot, EngineError, Expense, Money, ResultEngine, budgets, expenses,
    monthly_expenses,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

/// Result of recording an expense.
#[derive(Clone, Debug)]
pub struct ExpenseRecorded {
    pub expense: Expense,
    /// Today's budget row after the decrement; `None` when the expense was
    /// dated in the past.
    pub budget: Option<BudgetSnapshot>,
}

/// One page of the expense listing, newest first.
#[derive(Clone, Debug)]
pub struct ExpenseListPage {
    pub expenses: Vec<Expense>,
    /// Opaque cursor for fetching the next (older) page.
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExpensesCursor {
    created_at: DateTime<Utc>,
    expense_id: String,
}

impl ExpensesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))
    }
}

impl Engine {
    /// Records an expense against an account.
    ///
    /// An expense dated today decrements today's budget row (creating it
    /// first when this is the day's first budget activity). The daily budget
    /// may go negative; overspending is visible, not forbidden.
    pub async fn record_expense(
        &self,
        user_id: &str,
        account_id: i32,
        amount: Money,
        category: &str,
        note: Option<&str>,
        spent_on: Option<NaiveDate>,
    ) -> ResultEngine<ExpenseRecorded> {
        if amount.rupiah() <= 0 {
            return Err(EngineError::InvalidAmount(
                "expense amount must be positive".to_string(),
            ));
        }
        let category = normalize_required_name(category, "category")?;
        let note = normalize_optional_text(note);
        let created_at = Utc::now();

        with_tx!(self, |db_tx| {
            self.require_account_owned(&db_tx, account_id, user_id)
                .await?;

            let today = self.today();
            let spent_on = spent_on.unwrap_or(today);

            let inserted = expenses::new_expense(
                user_id,
                account_id,
                amount,
                &category,
                note.as_deref(),
                spent_on,
                created_at,
            )
            .insert(&db_tx)
            .await?;

            let budget = if spent_on == today {
                Some(
                    self.spend_from_daily_budget(&db_tx, user_id, account_id, amount)
                        .await?,
                )
            } else {
                None
            };

            Ok(ExpenseRecorded {
                expense: Expense::try_from(inserted)?,
                budget,
            })
        })
    }

    /// Decrements today's `daily_budget`, materializing the row first when
    /// the recalculator has not run yet today.
    async fn spend_from_daily_budget(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: i32,
        amount: Money,
    ) -> ResultEngine<BudgetSnapshot> {
        let today = self.today();
        let existing = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::AccountId.eq(account_id))
            .filter(budgets::Column::BudgetDate.eq(today))
            .one(db)
            .await?;

        let row = match existing {
            Some(row) => row,
            None => {
                let amounts = self.bucket_amounts(db, account_id).await?;
                let kebutuhan = amounts
                    .get(&AllocationKind::Kebutuhan)
                    .copied()
                    .unwrap_or(Money::ZERO);
                self.refresh_daily_budget(db, user_id, account_id, kebutuhan)
                    .await;
                budgets::Entity::find()
                    .filter(budgets::Column::UserId.eq(user_id))
                    .filter(budgets::Column::AccountId.eq(account_id))
                    .filter(budgets::Column::BudgetDate.eq(today))
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        EngineError::Inconsistent("budget row missing after refresh".to_string())
                    })?
            }
        };

        let remaining = Money::new(row.daily_budget) - amount;
        let mut active: budgets::ActiveModel = row.into();
        active.daily_budget = ActiveValue::Set(remaining.rupiah());
        let updated = active.update(db).await?;
        Ok(BudgetSnapshot::from_model(&updated))
    }

    /// Lists expenses newest-first with opaque cursor pagination.
    pub async fn list_expenses(
        &self,
        user_id: &str,
        account_id: Option<i32>,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<ExpenseListPage> {
        let limit = limit.clamp(1, 200);
        let cursor = cursor.map(ExpensesCursor::decode).transpose()?;

        with_tx!(self, |db_tx| {
            if let Some(account_id) = account_id {
                self.require_account_owned(&db_tx, account_id, user_id)
                    .await?;
            }

            let mut query = expenses::Entity::find()
                .filter(expenses::Column::UserId.eq(user_id))
                .order_by_desc(expenses::Column::CreatedAt)
                .order_by_desc(expenses::Column::Id)
                .limit(limit + 1);
            if let Some(account_id) = account_id {
                query = query.filter(expenses::Column::AccountId.eq(account_id));
            }
            if let Some(cursor) = &cursor {
                query = query.filter(
                    Condition::any()
                        .add(expenses::Column::CreatedAt.lt(cursor.created_at))
                        .add(
                            Condition::all()
                                .add(expenses::Column::CreatedAt.eq(cursor.created_at))
                                .add(expenses::Column::Id.lt(cursor.expense_id.clone())),
                        ),
                );
            }

            let mut rows = query.all(&db_tx).await?;
            let next_cursor = if rows.len() as u64 > limit {
                rows.truncate(limit as usize);
                rows.last()
                    .map(|last| {
                        ExpensesCursor {
                            created_at: last.created_at,
                            expense_id: last.id.clone(),
                        }
                        .encode()
                    })
                    .transpose()?
            } else {
                None
            };

            let expenses = rows
                .into_iter()
                .map(Expense::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ExpenseListPage {
                expenses,
                next_cursor,
            })
        })
    }

    /// Every expense of the user, oldest first. Backs the CSV export.
    pub async fn export_expenses(&self, user_id: &str) -> ResultEngine<Vec<Expense>> {
        let rows = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .order_by_asc(expenses::Column::SpentOn)
            .order_by_asc(expenses::Column::CreatedAt)
            .all(&self.database)
            .await?;
        rows.into_iter().map(Expense::try_from).collect()
    }

    /// Sum of one day's expenses for (user, account). Feeds the daily-saving
    /// carry-forward.
    pub(super) async fn expense_total_on_tx(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: i32,
        date: NaiveDate,
    ) -> ResultEngine<Money> {
        let backend = db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount), 0) AS total \
             FROM expenses \
             WHERE user_id = ? AND account_id = ? AND spent_on = ?",
            [user_id.into(), account_id.into(), date.into()],
        );
        let row = db.query_one(stmt).await?;
        let total: i64 = row.and_then(|r| r.try_get("", "total").ok()).unwrap_or(0);
        Ok(Money::new(total))
    }

    /// Sum of the user's active recurring obligations.
    pub(super) async fn monthly_expense_total_tx(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Money> {
        let backend = db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount), 0) AS total \
             FROM monthly_expenses \
             WHERE user_id = ? AND active = TRUE",
            [user_id.into()],
        );
        let row = db.query_one(stmt).await?;
        let total: i64 = row.and_then(|r| r.try_get("", "total").ok()).unwrap_or(0);
        Ok(Money::new(total))
    }

    /// Registers a recurring monthly obligation.
    pub async fn add_monthly_expense(
        &self,
        user_id: &str,
        name: &str,
        amount: Money,
    ) -> ResultEngine<monthly_expenses::Model> {
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "monthly amount must not be negative".to_string(),
            ));
        }
        let name = normalize_required_name(name, "monthly expense")?;

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            let inserted = monthly_expenses::new_monthly_expense(user_id, &name, amount)
                .insert(&db_tx)
                .await?;
            Ok(inserted)
        })
    }

    pub async fn list_monthly_expenses(
        &self,
        user_id: &str,
    ) -> ResultEngine<Vec<monthly_expenses::Model>> {
        monthly_expenses::Entity::find()
            .filter(monthly_expenses::Column::UserId.eq(user_id))
            .filter(monthly_expenses::Column::Active.eq(true))
            .order_by_asc(monthly_expenses::Column::Id)
            .all(&self.database)
            .await
            .map_err(Into::into)
    }

    /// Deactivates a recurring obligation. The row is kept for history.
    pub async fn remove_monthly_expense(&self, user_id: &str, id: i32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let row = monthly_expenses::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("monthly expense not exists".to_string())
                })?;
            if row.user_id != user_id {
                return Err(EngineError::Forbidden(
                    "monthly expense belongs to another user".to_string(),
                ));
            }
            let mut active: monthly_expenses::ActiveModel = row.into();
            active.active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            Ok(())
        })
    }
}
