//! Account API endpoints.

use api_types::account::{
    AccountCreatedResponse, AccountNew, AccountView, AccountsResponse, AllocationView,
    BalanceUpdate, BalanceUpdateResponse,
};
use api_types::budget::BudgetTracking;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::Money;

use crate::{ServerError, kind_to_api, kind_to_engine, server::ServerState, user};

pub(crate) fn allocation_view(allocation: &engine::Allocation) -> AllocationView {
    AllocationView {
        id: allocation.id,
        account_id: allocation.account_id,
        kind: kind_to_api(allocation.kind),
        balance: allocation.balance.rupiah(),
        allocation_date: allocation.allocation_date,
    }
}

pub(crate) fn account_view(account: &engine::AccountSnapshot) -> AccountView {
    AccountView {
        id: account.id,
        bank_id: account.bank_id,
        bank_name: account.bank_name.clone(),
        initial_balance: account.initial_balance.rupiah(),
        current_balance: account.current_balance.rupiah(),
        created_at: account.created_at,
        allocations: account.allocations.iter().map(allocation_view).collect(),
    }
}

pub(crate) fn budget_view(snapshot: &engine::BudgetSnapshot) -> BudgetTracking {
    BudgetTracking {
        account_id: snapshot.account_id,
        date: snapshot.date,
        daily_budget: snapshot.daily_budget,
        initial_daily_budget: snapshot.initial_daily_budget,
        daily_saving: snapshot.daily_saving,
        degraded: snapshot.degraded,
    }
}

/// Handle requests for attaching a new bank account.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<Json<AccountCreatedResponse>, ServerError> {
    let created = state
        .engine
        .add_account(
            &user.username,
            payload.bank_id,
            kind_to_engine(payload.kind),
            Money::new(payload.balance),
        )
        .await?;

    Ok(Json(AccountCreatedResponse {
        account: account_view(&created.account),
        total_accounts: created.total_accounts,
        message: created.message,
        accounts: created.accounts.iter().map(account_view).collect(),
        budget_tracking: created.budget.as_ref().map(budget_view),
    }))
}

/// Handle requests for the full accounts/allocations snapshot.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<AccountsResponse>, ServerError> {
    let snapshot = state.engine.accounts_snapshot(&user.username).await?;
    Ok(Json(AccountsResponse {
        accounts: snapshot.accounts.iter().map(account_view).collect(),
    }))
}

/// Handle requests for setting one bucket's balance on an account.
pub async fn update_balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(account_id): Path<i32>,
    Json(payload): Json<BalanceUpdate>,
) -> Result<Json<BalanceUpdateResponse>, ServerError> {
    let written = state
        .engine
        .update_account_balance(
            &user.username,
            account_id,
            kind_to_engine(payload.kind),
            Money::new(payload.balance),
        )
        .await?;

    Ok(Json(BalanceUpdateResponse {
        allocation: allocation_view(&written.allocation),
        account_balance: written.account_balance.rupiah(),
        budget_tracking: written.budget.as_ref().map(budget_view),
    }))
}
