//! Read-only gamification and reporting queries.
//!
//! Everything here consumes allocation and expense totals; nothing writes
//! inside the rebalancing transaction. Badges are plain threshold counters.

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*};

use crate::{AllocationKind, EngineError, Money, ResultEngine, budgets, goals};

use super::{Engine, normalize_required_name, with_tx};

/// Progress of one savings goal against the user's Tabungan total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoalProgress {
    pub id: i32,
    pub name: String,
    pub target: Money,
    pub saved: Money,
    /// Whole percents, capped at 100.
    pub percent: u8,
    pub reached: bool,
}

/// A gamification badge and whether the user has earned it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Badge {
    pub code: &'static str,
    pub label: &'static str,
    pub earned: bool,
}

/// Aggregate figures handed to the advice proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinanceSummary {
    pub account_count: u64,
    pub kebutuhan_total: Money,
    pub tabungan_total: Money,
    pub darurat_total: Money,
    pub monthly_expense_total: Money,
    pub daily_saving_total: Money,
    pub streak_days: u32,
}

impl Engine {
    /// Creates a savings goal.
    pub async fn add_goal(
        &self,
        user_id: &str,
        name: &str,
        target: Money,
    ) -> ResultEngine<goals::Model> {
        if target.rupiah() <= 0 {
            return Err(EngineError::InvalidAmount(
                "goal target must be positive".to_string(),
            ));
        }
        let name = normalize_required_name(name, "goal")?;

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            let inserted = goals::new_goal(user_id, &name, target, Utc::now())
                .insert(&db_tx)
                .await?;
            Ok(inserted)
        })
    }

    /// All goals with their progress against the current Tabungan total.
    pub async fn goal_progress(&self, user_id: &str) -> ResultEngine<Vec<GoalProgress>> {
        let saved = self.kind_total(user_id, AllocationKind::Tabungan).await?;
        let rows = goals::Entity::find()
            .filter(goals::Column::UserId.eq(user_id))
            .order_by_asc(goals::Column::Id)
            .all(&self.database)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let target = Money::new(row.target);
                let percent = if row.target <= 0 {
                    100
                } else {
                    ((saved.rupiah().max(0) * 100) / row.target).min(100) as u8
                };
                GoalProgress {
                    id: row.id,
                    name: row.name,
                    target,
                    saved,
                    percent,
                    reached: saved >= target,
                }
            })
            .collect())
    }

    /// Days in a row (ending today or yesterday) the user closed without
    /// overspending: every budget row of the day still at `daily_budget >= 0`.
    pub async fn streak_days(&self, user_id: &str) -> ResultEngine<u32> {
        let rows = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::BudgetDate)
            .all(&self.database)
            .await?;

        let mut on_budget = std::collections::BTreeMap::new();
        for row in rows {
            let entry = on_budget.entry(row.budget_date).or_insert(true);
            *entry &= row.daily_budget >= 0;
        }

        let today = self.today();
        let mut cursor = if on_budget.contains_key(&today) {
            today
        } else {
            today - Duration::days(1)
        };

        let mut streak = 0u32;
        while let Some(ok) = on_budget.get(&cursor) {
            if !ok {
                break;
            }
            streak += 1;
            match cursor.pred_opt() {
                Some(prev) => cursor = prev,
                None => break,
            }
        }
        Ok(streak)
    }

    /// Threshold badges over accounts, expenses, streaks and goals.
    pub async fn badges(&self, user_id: &str) -> ResultEngine<Vec<Badge>> {
        let account_count = self.count_for_user(user_id, "accounts").await?;
        let expense_count = self.count_for_user(user_id, "expenses").await?;
        let streak = self.streak_days(user_id).await?;
        let goal_reached = self
            .goal_progress(user_id)
            .await?
            .iter()
            .any(|g| g.reached);

        Ok(vec![
            Badge {
                code: "first-account",
                label: "Opened a first account",
                earned: account_count >= 1,
            },
            Badge {
                code: "bucket-organizer",
                label: "One account per bucket",
                earned: account_count >= 3,
            },
            Badge {
                code: "first-expense",
                label: "Recorded a first expense",
                earned: expense_count >= 1,
            },
            Badge {
                code: "consistent-week",
                label: "Seven days on budget",
                earned: streak >= 7,
            },
            Badge {
                code: "goal-reached",
                label: "Reached a savings goal",
                earned: goal_reached,
            },
        ])
    }

    /// The aggregate view handed to the advice proxy.
    pub async fn finance_summary(&self, user_id: &str) -> ResultEngine<FinanceSummary> {
        let account_count = self.count_for_user(user_id, "accounts").await?;
        let kebutuhan_total = self.kind_total(user_id, AllocationKind::Kebutuhan).await?;
        let tabungan_total = self.kind_total(user_id, AllocationKind::Tabungan).await?;
        let darurat_total = self.kind_total(user_id, AllocationKind::Darurat).await?;
        let streak_days = self.streak_days(user_id).await?;

        let backend = self.database.get_database_backend();
        let monthly_expense_total: i64 = {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount), 0) AS total \
                 FROM monthly_expenses WHERE user_id = ? AND active = TRUE",
                [user_id.into()],
            );
            let row = self.database.query_one(stmt).await?;
            row.and_then(|r| r.try_get("", "total").ok()).unwrap_or(0)
        };

        let today = self.today();
        let daily_saving_total: i64 = {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(daily_saving), 0) AS total \
                 FROM budgets WHERE user_id = ? AND budget_date = ?",
                [user_id.into(), today.into()],
            );
            let row = self.database.query_one(stmt).await?;
            row.and_then(|r| r.try_get("", "total").ok()).unwrap_or(0)
        };

        Ok(FinanceSummary {
            account_count,
            kebutuhan_total,
            tabungan_total,
            darurat_total,
            monthly_expense_total: Money::new(monthly_expense_total),
            daily_saving_total: Money::new(daily_saving_total),
            streak_days,
        })
    }

    /// The user's total across all allocations of one kind.
    async fn kind_total(&self, user_id: &str, kind: AllocationKind) -> ResultEngine<Money> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(al.balance), 0) AS total \
             FROM account_allocations al \
             INNER JOIN accounts ac ON ac.id = al.account_id \
             WHERE ac.user_id = ? AND al.kind = ?",
            [user_id.into(), kind.as_str().into()],
        );
        let row = self.database.query_one(stmt).await?;
        let total: i64 = row.and_then(|r| r.try_get("", "total").ok()).unwrap_or(0);
        Ok(Money::new(total))
    }

    async fn count_for_user(&self, user_id: &str, table: &str) -> ResultEngine<u64> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            format!("SELECT COUNT(*) AS total FROM {table} WHERE user_id = ?"),
            [user_id.into()],
        );
        let row = self.database.query_one(stmt).await?;
        let total: i64 = row.and_then(|r| r.try_get("", "total").ok()).unwrap_or(0);
        Ok(total.max(0) as u64)
    }
}
