//! Administration route handlers
//!
//! Proposal lifecycle, grievance triage, user roles, and transparency
//! record registration. Role checks happen here; authentication is already
//! enforced by the middleware.

use crate::auth::{Claims, Role};
use crate::budget::BudgetProposal;
use crate::error::AppError;
use crate::grievance::{Grievance, GrievanceStatus};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use crate::transparency::{FundInput, FundRecord, Politician, PoliticianInput};
use crate::users::UserResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn require_admin(claims: &Claims) -> Result<(), AppError> {
    if !claims.role.can_administer() {
        return Err(AppError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }
    Ok(())
}

fn require_triage(claims: &Claims) -> Result<(), AppError> {
    if !claims.role.can_triage() {
        return Err(AppError::Forbidden(
            "Official or administrator role required".to_string(),
        ));
    }
    Ok(())
}

// ============================================
// Budget proposal lifecycle
// ============================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResponse {
    pub budget: BudgetProposal,
}

/// POST /api/budgets (admin)
pub async fn create_budget(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<SuccessResponse<BudgetResponse>>), AppError> {
    require_admin(&claims)?;
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let budget = state.budgets.create(req.title, req.description).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Budget proposal created",
            BudgetResponse { budget },
        )),
    ))
}

/// POST /api/budgets/{id}/close (admin)
///
/// Freezes the proposal's vote state.
pub async fn close_budget(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    require_admin(&claims)?;
    state.budgets.close(id).await?;
    Ok(Json(MessageResponse::new("Voting closed")))
}

/// DELETE /api/budgets/{id} (admin)
pub async fn delete_budget(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    require_admin(&claims)?;
    state.budgets.delete(id).await?;
    Ok(Json(MessageResponse::new("Budget proposal deleted")))
}

// ============================================
// Grievance triage
// ============================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: GrievanceStatus,
}

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

/// GET /api/admin/grievances (official/admin)
pub async fn list_grievances(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SuccessResponse<GrievanceListResponse>>, AppError> {
    require_triage(&claims)?;
    let grievances = state.grievances.list_all().await?;

    Ok(Json(SuccessResponse::with_data(
        "Grievances retrieved",
        GrievanceListResponse { grievances },
    )))
}

/// PUT /api/admin/grievances/{id}/status (official/admin)
pub async fn update_grievance_status(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<SuccessResponse<GrievanceResponse>>, AppError> {
    require_triage(&claims)?;
    let grievance = state.grievances.update_status(id, req.status).await?;

    Ok(Json(SuccessResponse::with_data(
        "Grievance status updated",
        GrievanceResponse { grievance },
    )))
}

/// DELETE /api/admin/grievances/{id} (admin)
pub async fn delete_grievance(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    require_admin(&claims)?;
    state.grievances.delete(id).await?;
    Ok(Json(MessageResponse::new("Grievance deleted")))
}

// ============================================
// User management
// ============================================

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UsersListResponse {
    pub success: bool,
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserResponseBody {
    pub success: bool,
    pub user: UserResponse,
}

/// GET /api/admin/users (admin)
pub async fn list_users(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UsersListResponse>, AppError> {
    require_admin(&claims)?;
    let users = state.users.list().await?;

    Ok(Json(UsersListResponse {
        success: true,
        users,
    }))
}

/// PUT /api/admin/users/{id}/role (admin)
pub async fn update_user_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponseBody>, AppError> {
    require_admin(&claims)?;
    let user = state.users.update_role(id, req.role).await?;

    Ok(Json(UserResponseBody {
        success: true,
        user: UserResponse::from(user),
    }))
}

// ============================================
// Transparency records
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundResponse {
    pub fund: FundRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticianResponse {
    pub politician: Politician,
}

/// POST /api/funds (admin)
pub async fn create_fund(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<FundInput>,
) -> Result<(StatusCode, Json<SuccessResponse<FundResponse>>), AppError> {
    require_admin(&claims)?;
    let fund = state.transparency.create_fund(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Fund record created",
            FundResponse { fund },
        )),
    ))
}

/// POST /api/politicians (admin)
pub async fn create_politician(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<PoliticianInput>,
) -> Result<(StatusCode, Json<SuccessResponse<PoliticianResponse>>), AppError> {
    require_admin(&claims)?;
    let politician = state.transparency.create_politician(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Politician record created",
            PoliticianResponse { politician },
        )),
    ))
}
