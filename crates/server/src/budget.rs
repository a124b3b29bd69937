//! Daily budget API endpoints.

use api_types::budget::BudgetTracking;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{ServerError, accounts::budget_view, server::ServerState, user};

#[derive(Debug, Deserialize)]
pub struct BudgetQuery {
    pub account_id: i32,
}

/// Handle requests for today's budget snapshot, computing it when absent.
pub async fn today(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<BudgetTracking>, ServerError> {
    let snapshot = state
        .engine
        .daily_budget_today(&user.username, query.account_id)
        .await?;
    Ok(Json(budget_view(&snapshot)))
}
