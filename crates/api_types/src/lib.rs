use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Budget bucket kind. The wire form is the canonical capitalized name;
/// anything else is rejected during deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationKind {
    Kebutuhan,
    Tabungan,
    Darurat,
}

pub mod budget {
    use super::*;

    /// Daily budget figures attached to mutation responses.
    ///
    /// `degraded: true` means the recompute failed and every figure is zero;
    /// the mutation that carried it still succeeded.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetTracking {
        pub account_id: i32,
        pub date: NaiveDate,
        pub daily_budget: i64,
        pub initial_daily_budget: i64,
        pub daily_saving: i64,
        pub degraded: bool,
    }
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationView {
        pub id: i32,
        pub account_id: i32,
        pub kind: AllocationKind,
        pub balance: i64,
        pub allocation_date: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: i32,
        pub bank_id: i32,
        pub bank_name: String,
        pub initial_balance: i64,
        pub current_balance: i64,
        /// RFC3339 timestamp.
        pub created_at: DateTime<Utc>,
        pub allocations: Vec<AllocationView>,
    }

    /// Request body for attaching a new bank account.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub bank_id: i32,
        pub kind: AllocationKind,
        pub balance: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountCreatedResponse {
        pub account: AccountView,
        pub total_accounts: usize,
        /// Advisory one-liner, informational only.
        pub message: String,
        pub accounts: Vec<AccountView>,
        pub budget_tracking: Option<budget::BudgetTracking>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<AccountView>,
    }

    /// Request body for setting one bucket's balance on an account.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceUpdate {
        pub kind: AllocationKind,
        pub balance: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceUpdateResponse {
        pub allocation: AllocationView,
        pub account_balance: i64,
        pub budget_tracking: Option<budget::BudgetTracking>,
    }
}

pub mod allocation {
    use super::*;

    /// Request body for PATCHing an allocation. At least one field must be
    /// present.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationUpdate {
        pub new_kind: Option<AllocationKind>,
        pub new_balance: Option<i64>,
    }

    /// What the update did.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ChangeKind {
        NoOp,
        BalanceOnly,
        Relabelled,
        Swapped,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChangeSummary {
        pub change: ChangeKind,
        /// The allocation the change was exchanged with, when swapped.
        pub counterpart_id: Option<i32>,
        pub allocation: account::AllocationView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationUpdateResponse {
        pub change_summary: ChangeSummary,
        pub updated_accounts: Vec<account::AccountView>,
        pub budget_tracking: Option<budget::BudgetTracking>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub account_id: i32,
        pub amount: i64,
        pub category: String,
        pub note: Option<String>,
        /// Defaults to today (engine timezone) when absent.
        pub spent_on: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub account_id: i32,
        pub amount: i64,
        pub category: String,
        pub note: Option<String>,
        pub spent_on: NaiveDate,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreatedResponse {
        pub expense: ExpenseView,
        pub budget_tracking: Option<budget::BudgetTracking>,
    }

    /// Query string for the listing endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListQuery {
        pub account_id: Option<i32>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyExpenseNew {
        pub name: String,
        pub amount: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyExpenseView {
        pub id: i32,
        pub name: String,
        pub amount: i64,
    }
}

pub mod goal {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub name: String,
        pub target: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: i32,
        pub name: String,
        pub target: i64,
        pub saved: i64,
        /// Whole percents, capped at 100.
        pub percent: u8,
        pub reached: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalsResponse {
        pub goals: Vec<GoalView>,
    }
}

pub mod insight {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BadgeView {
        pub code: String,
        pub label: String,
        pub earned: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BadgesResponse {
        pub badges: Vec<BadgeView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StreakResponse {
        pub days: u32,
    }
}

pub mod advice {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdviceResponse {
        pub advice: String,
    }
}
