//! The Celengan engine: accounts, budget buckets and the rebalancing rules
//! that keep them consistent.
//!
//! The engine is storage-backed: every public operation opens one database
//! transaction, applies the rebalancing policy from [`rebalance`], and
//! commits only when the whole redistribution succeeded. HTTP concerns live
//! in the `server` crate; this crate knows nothing about requests.

pub use accounts::AccountSnapshot;
pub use allocations::{Allocation, AllocationKind};
pub use budgets::BudgetSnapshot;
pub use error::EngineError;
pub use expenses::Expense;
pub use money::Money;
pub use ops::{
    AccountCreated, AccountsSnapshot, AllocationChange, AllocationWrite, Badge, BalanceWrite,
    DEFAULT_TIMEZONE, Engine, EngineBuilder, ExpenseListPage, ExpenseRecorded, FinanceSummary,
    GoalProgress,
};

pub mod accounts;
pub mod allocations;
pub mod banks;
pub mod budgets;
mod error;
pub mod expenses;
pub mod goals;
mod money;
pub mod monthly_expenses;
mod ops;
pub mod rebalance;
pub mod users;
pub mod util;

type ResultEngine<T> = Result<T, EngineError>;
