//! Expense ledger API endpoints, including the CSV export and the recurring
//! monthly obligations that shrink the daily-budget base.

use api_types::expense::{
    ExpenseCreatedResponse, ExpenseListQuery, ExpenseListResponse, ExpenseNew, ExpenseView,
    MonthlyExpenseNew, MonthlyExpenseView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use engine::Money;

use crate::{ServerError, accounts::budget_view, server::ServerState, user};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn expense_view(expense: &engine::Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        account_id: expense.account_id,
        amount: expense.amount.rupiah(),
        category: expense.category.clone(),
        note: expense.note.clone(),
        spent_on: expense.spent_on,
        created_at: expense.created_at,
    }
}

/// Handle requests for recording an expense.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseCreatedResponse>, ServerError> {
    let recorded = state
        .engine
        .record_expense(
            &user.username,
            payload.account_id,
            Money::new(payload.amount),
            &payload.category,
            payload.note.as_deref(),
            payload.spent_on,
        )
        .await?;

    Ok(Json(ExpenseCreatedResponse {
        expense: expense_view(&recorded.expense),
        budget_tracking: recorded.budget.as_ref().map(budget_view),
    }))
}

/// Handle requests for listing expenses, newest first.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let page = state
        .engine
        .list_expenses(
            &user.username,
            query.account_id,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.cursor.as_deref(),
        )
        .await?;

    Ok(Json(ExpenseListResponse {
        expenses: page.expenses.iter().map(expense_view).collect(),
        next_cursor: page.next_cursor,
    }))
}

/// Handle requests for the CSV export of the full ledger.
pub async fn export(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<impl IntoResponse, ServerError> {
    let expenses = state.engine.export_expenses(&user.username).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["spent_on", "account_id", "amount", "category", "note"])
        .map_err(|err| ServerError::Generic(err.to_string()))?;
    for expense in &expenses {
        writer
            .write_record([
                expense.spent_on.to_string(),
                expense.account_id.to_string(),
                expense.amount.rupiah().to_string(),
                expense.category.clone(),
                expense.note.clone().unwrap_or_default(),
            ])
            .map_err(|err| ServerError::Generic(err.to_string()))?;
    }
    let body = writer
        .into_inner()
        .map_err(|err| ServerError::Generic(err.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"expenses.csv\"",
            ),
        ],
        body,
    ))
}

/// Handle requests for registering a recurring monthly obligation.
pub async fn monthly_create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MonthlyExpenseNew>,
) -> Result<Json<MonthlyExpenseView>, ServerError> {
    let row = state
        .engine
        .add_monthly_expense(&user.username, &payload.name, Money::new(payload.amount))
        .await?;

    Ok(Json(MonthlyExpenseView {
        id: row.id,
        name: row.name,
        amount: row.amount,
    }))
}

/// Handle requests for listing active monthly obligations.
pub async fn monthly_list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<MonthlyExpenseView>>, ServerError> {
    let rows = state.engine.list_monthly_expenses(&user.username).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| MonthlyExpenseView {
                id: row.id,
                name: row.name,
                amount: row.amount,
            })
            .collect(),
    ))
}

/// Handle requests for retiring a monthly obligation.
pub async fn monthly_remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_monthly_expense(&user.username, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
