//! Grievance route handlers (citizen-facing)

use crate::auth::Claims;
use crate::error::AppError;
use crate::grievance::{Grievance, GrievanceInput, GrievanceLocation};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceResponse {
    pub grievance: Grievance,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceListResponse {
    pub grievances: Vec<Grievance>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsResponse {
    pub locations: Vec<GrievanceLocation>,
}

/// POST /api/grievances
///
/// File a new grievance for the signed-in citizen.
pub async fn submit(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<GrievanceInput>,
) -> Result<(StatusCode, Json<SuccessResponse<GrievanceResponse>>), AppError> {
    let grievance = state.grievances.submit(claims.sub, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Grievance submitted successfully",
            GrievanceResponse { grievance },
        )),
    ))
}

/// GET /api/grievances/mine
///
/// The signed-in citizen's grievances, newest first.
pub async fn mine(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SuccessResponse<GrievanceListResponse>>, AppError> {
    let grievances = state.grievances.list_for_user(claims.sub).await?;

    Ok(Json(SuccessResponse::with_data(
        "Grievances retrieved",
        GrievanceListResponse { grievances },
    )))
}

/// GET /api/grievances/locations
///
/// Located grievances for the public heatmap.
pub async fn locations(
    State(state): State<SharedState>,
) -> Result<Json<SuccessResponse<LocationsResponse>>, AppError> {
    let locations = state.grievances.locations().await?;

    Ok(Json(SuccessResponse::with_data(
        "Grievance locations retrieved",
        LocationsResponse { locations },
    )))
}
