//! Allocation API endpoints.

use api_types::allocation::{
    AllocationUpdate, AllocationUpdateResponse, ChangeKind, ChangeSummary,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{AllocationChange, Money};

use crate::{
    ServerError,
    accounts::{account_view, allocation_view, budget_view},
    kind_to_engine,
    server::ServerState,
    user,
};

/// Handle requests for reassigning an allocation's kind and/or balance.
pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(allocation_id): Path<i32>,
    Json(payload): Json<AllocationUpdate>,
) -> Result<Json<AllocationUpdateResponse>, ServerError> {
    let written = state
        .engine
        .update_allocation(
            &user.username,
            allocation_id,
            payload.new_kind.map(kind_to_engine),
            payload.new_balance.map(Money::new),
        )
        .await?;

    let (change, counterpart_id) = match written.change {
        AllocationChange::NoOp => (ChangeKind::NoOp, None),
        AllocationChange::BalanceOnly => (ChangeKind::BalanceOnly, None),
        AllocationChange::Relabelled => (ChangeKind::Relabelled, None),
        AllocationChange::Swapped { counterpart_id } => {
            (ChangeKind::Swapped, Some(counterpart_id))
        }
    };

    Ok(Json(AllocationUpdateResponse {
        change_summary: ChangeSummary {
            change,
            counterpart_id,
            allocation: allocation_view(&written.allocation),
        },
        updated_accounts: written.accounts.iter().map(account_view).collect(),
        budget_tracking: written.budget.as_ref().map(budget_view),
    }))
}
