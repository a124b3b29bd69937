//! Gamification API endpoints: goals, badges, streaks.

use api_types::goal::{GoalNew, GoalView, GoalsResponse};
use api_types::insight::{BadgeView, BadgesResponse, StreakResponse};
use axum::{Extension, Json, extract::State};
use engine::Money;

use crate::{ServerError, server::ServerState, user};

/// Handle requests for creating a savings goal.
pub async fn goal_create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GoalNew>,
) -> Result<Json<GoalView>, ServerError> {
    let row = state
        .engine
        .add_goal(&user.username, &payload.name, Money::new(payload.target))
        .await?;

    Ok(Json(GoalView {
        id: row.id,
        name: row.name,
        target: row.target,
        saved: 0,
        percent: 0,
        reached: false,
    }))
}

/// Handle requests for listing goals with progress.
pub async fn goals(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GoalsResponse>, ServerError> {
    let progress = state.engine.goal_progress(&user.username).await?;
    Ok(Json(GoalsResponse {
        goals: progress
            .into_iter()
            .map(|goal| GoalView {
                id: goal.id,
                name: goal.name,
                target: goal.target.rupiah(),
                saved: goal.saved.rupiah(),
                percent: goal.percent,
                reached: goal.reached,
            })
            .collect(),
    }))
}

/// Handle requests for the badge list.
pub async fn badges(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BadgesResponse>, ServerError> {
    let badges = state.engine.badges(&user.username).await?;
    Ok(Json(BadgesResponse {
        badges: badges
            .into_iter()
            .map(|badge| BadgeView {
                code: badge.code.to_string(),
                label: badge.label.to_string(),
                earned: badge.earned,
            })
            .collect(),
    }))
}

/// Handle requests for the on-budget streak.
pub async fn streak(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<StreakResponse>, ServerError> {
    let days = state.engine.streak_days(&user.username).await?;
    Ok(Json(StreakResponse { days }))
}
