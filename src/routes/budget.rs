//! Budget voting route handlers
//!
//! Ballot listing and the vote toggle.

use crate::auth::{bearer_claims, Claims};
use crate::budget::BallotEntry;
use crate::error::AppError;
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleVoteRequest {
    /// The caller's last-known vote state. Advisory only: the ledger
    /// resolves against the stored voter set.
    pub has_voted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleVoteResponse {
    pub vote_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotResponse {
    pub budgets: Vec<BallotEntry>,
}

/// GET /api/budgets
///
/// List all budget proposals. With a valid bearer token, each entry's
/// `hasVoted` reflects the caller's own vote.
pub async fn list_budgets(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse<BallotResponse>>, AppError> {
    let viewer = bearer_claims(&headers).map(|c| c.sub);
    let budgets = state.budgets.ballot(viewer).await?;

    Ok(Json(SuccessResponse::with_data(
        "Budget proposals retrieved",
        BallotResponse { budgets },
    )))
}

/// POST /api/budgets/{id}/vote
///
/// Toggle the caller's vote on a proposal. Returns the authoritative vote
/// count after the operation, whether or not the toggle changed anything.
pub async fn toggle_vote(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleVoteRequest>,
) -> Result<Json<SuccessResponse<ToggleVoteResponse>>, AppError> {
    let vote_count = state
        .budgets
        .toggle_vote(id, claims.sub, req.has_voted)
        .await?;

    let message = if req.has_voted {
        "Vote withdrawn"
    } else {
        "Vote cast"
    };
    Ok(Json(SuccessResponse::with_data(
        message,
        ToggleVoteResponse { vote_count },
    )))
}
