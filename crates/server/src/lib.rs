use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{AdviceConfig, run, run_with_listener, spawn_with_listener};

mod accounts;
mod advice;
mod allocations;
mod budget;
mod expenses;
mod insights;
mod server;
mod user;

pub mod types {
    pub mod account {
        pub use api_types::account::{
            AccountCreatedResponse, AccountNew, AccountView, AccountsResponse, BalanceUpdate,
            BalanceUpdateResponse,
        };
    }

    pub mod allocation {
        pub use api_types::allocation::{AllocationUpdate, AllocationUpdateResponse, ChangeSummary};
    }

    pub mod budget {
        pub use api_types::budget::BudgetTracking;
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseCreatedResponse, ExpenseListQuery, ExpenseListResponse, ExpenseNew,
            MonthlyExpenseNew, MonthlyExpenseView,
        };
    }

    pub mod goal {
        pub use api_types::goal::{GoalNew, GoalsResponse};
    }

    pub mod insight {
        pub use api_types::insight::{BadgesResponse, StreakResponse};
    }

    pub mod advice {
        pub use api_types::advice::AdviceResponse;
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
    /// The advice upstream failed after retries.
    Upstream(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::Inconsistent(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidKind(_)
        | EngineError::PolicyViolation(_)
        | EngineError::InvalidCursor(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Upstream(err) => {
                tracing::error!("advice upstream error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "advice service unavailable".to_string(),
                )
            }
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Maps the wire bucket kind into the engine's.
pub(crate) fn kind_to_engine(kind: api_types::AllocationKind) -> engine::AllocationKind {
    match kind {
        api_types::AllocationKind::Kebutuhan => engine::AllocationKind::Kebutuhan,
        api_types::AllocationKind::Tabungan => engine::AllocationKind::Tabungan,
        api_types::AllocationKind::Darurat => engine::AllocationKind::Darurat,
    }
}

pub(crate) fn kind_to_api(kind: engine::AllocationKind) -> api_types::AllocationKind {
    match kind {
        engine::AllocationKind::Kebutuhan => api_types::AllocationKind::Kebutuhan,
        engine::AllocationKind::Tabungan => api_types::AllocationKind::Tabungan,
        engine::AllocationKind::Darurat => api_types::AllocationKind::Darurat,
    }
}
