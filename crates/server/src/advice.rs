//! Advice proxy endpoint.
//!
//! Builds a compact finance summary and forwards it to a generative-language
//! API for narrative advice. The upstream call is retried with capped
//! exponential backoff; domain state is never touched, so a failure here is
//! only ever a 502.

use std::time::Duration;

use api_types::advice::AdviceResponse;
use axum::{Extension, Json, extract::State};
use engine::FinanceSummary;
use serde::{Deserialize, Serialize};

use crate::{ServerError, server::ServerState, user};

const BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

fn prompt_for(summary: &FinanceSummary) -> String {
    format!(
        "You are a frugal personal-finance coach. The user has {} bank account(s). \
         Bucket balances: needs Rp{}, savings Rp{}, emergency fund Rp{}. \
         Recurring monthly obligations: Rp{}. Saved from daily budgets today: Rp{}. \
         Current on-budget streak: {} day(s). \
         In at most three short paragraphs, give concrete advice on balancing \
         these buckets and keeping the streak alive. Answer in Indonesian.",
        summary.account_count,
        summary.kebutuhan_total.rupiah(),
        summary.tabungan_total.rupiah(),
        summary.darurat_total.rupiah(),
        summary.monthly_expense_total.rupiah(),
        summary.daily_saving_total.rupiah(),
        summary.streak_days,
    )
}

/// Handle requests for AI-generated advice.
pub async fn generate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<AdviceResponse>, ServerError> {
    let Some(config) = state.advice.clone() else {
        return Err(ServerError::Upstream("advice not configured".to_string()));
    };

    let summary = state.engine.finance_summary(&user.username).await?;
    let body = GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: prompt_for(&summary),
            }],
        }],
    };

    let client = reqwest::Client::new();
    let url = format!("{}?key={}", config.api_url, config.api_key);

    let mut last_error = String::new();
    for attempt in 0..config.max_retries.max(1) {
        if attempt > 0 {
            tokio::time::sleep(BACKOFF_BASE * 2u32.saturating_pow(attempt - 1)).await;
        }

        let response = match client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                last_error = err.to_string();
                continue;
            }
        };

        let status = response.status();
        if status.is_server_error() {
            last_error = format!("upstream returned {status}");
            continue;
        }
        if !status.is_success() {
            // 4xx will not get better by retrying.
            return Err(ServerError::Upstream(format!("upstream returned {status}")));
        }

        let parsed: GenerateResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                last_error = err.to_string();
                continue;
            }
        };

        let advice = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();
        if advice.is_empty() {
            last_error = "upstream returned no candidates".to_string();
            continue;
        }

        return Ok(Json(AdviceResponse { advice }));
    }

    Err(ServerError::Upstream(last_error))
}
