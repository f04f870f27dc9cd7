//! Transparency dashboard route handlers (public reads)

use crate::error::AppError;
use crate::models::SuccessResponse;
use crate::state::SharedState;
use crate::transparency::{DepartmentRollup, FundRecord, Politician};
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundListResponse {
    pub funds: Vec<FundRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupResponse {
    pub departments: Vec<DepartmentRollup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticianListResponse {
    pub politicians: Vec<Politician>,
}

/// GET /api/funds
pub async fn list_funds(
    State(state): State<SharedState>,
) -> Result<Json<SuccessResponse<FundListResponse>>, AppError> {
    let funds = state.transparency.list_funds().await?;

    Ok(Json(SuccessResponse::with_data(
        "Fund records retrieved",
        FundListResponse { funds },
    )))
}

/// GET /api/funds/departments
///
/// Per-department allocation/utilisation rollup for the dashboard charts.
pub async fn department_rollup(
    State(state): State<SharedState>,
) -> Result<Json<SuccessResponse<RollupResponse>>, AppError> {
    let departments = state.transparency.department_rollup().await?;

    Ok(Json(SuccessResponse::with_data(
        "Department rollup retrieved",
        RollupResponse { departments },
    )))
}

/// GET /api/politicians
pub async fn list_politicians(
    State(state): State<SharedState>,
) -> Result<Json<SuccessResponse<PoliticianListResponse>>, AppError> {
    let politicians = state.transparency.list_politicians().await?;

    Ok(Json(SuccessResponse::with_data(
        "Politicians retrieved",
        PoliticianListResponse { politicians },
    )))
}
