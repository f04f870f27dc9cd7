//! Authentication route handlers
//!
//! Registration, login, token refresh, and current-user lookup.

use crate::auth::{
    create_tokens, hash_password, refresh_tokens, verify_password, Claims, Role, TokenPair,
};
use crate::error::AppError;
use crate::state::SharedState;
use crate::users::UserResponse;
use axum::{extract::State, http::StatusCode, Extension, Json};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use validator::Validate;

static AADHAAR_RE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^[0-9]{12}$").expect("valid aadhaar regex"));

/// Aadhaar numbers are 12 digits; only the format is checked here
fn validate_aadhaar(aadhaar: &str) -> Result<(), validator::ValidationError> {
    if !AADHAAR_RE.is_match(aadhaar) {
        let mut err = validator::ValidationError::new("invalid_aadhaar");
        err.message = Some("Must be a 12-digit Aadhaar number".into());
        return Err(err);
    }
    Ok(())
}

// ============================================
// Request/Response Types
// ============================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_aadhaar"))]
    pub aadhaar: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserResponse,
}

// ============================================
// Route Handlers
// ============================================

/// POST /api/auth/register
///
/// Register a new citizen account.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    let user = state
        .users
        .create(&req.email, &password_hash, &req.name, &req.aadhaar, Role::Citizen)
        .await?;

    let tokens = create_tokens(user.id, &user.email, user.role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user: UserResponse::from(user),
            tokens,
        }),
    ))
}

/// POST /api/auth/login
///
/// Authenticate with email and password, receive JWT tokens.
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let tokens = create_tokens(user.id, &user.email, user.role)?;

    Ok(Json(AuthResponse {
        success: true,
        user: UserResponse::from(user),
        tokens,
    }))
}

/// POST /api/auth/refresh
///
/// Refresh access token using refresh token.
pub async fn refresh(Json(req): Json<RefreshRequest>) -> Result<Json<TokenResponse>, AppError> {
    let tokens = refresh_tokens(&req.refresh_token)?;

    Ok(Json(TokenResponse {
        success: true,
        tokens,
    }))
}

/// GET /api/auth/me
///
/// Get current user info from the bearer token.
pub async fn me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    Ok(Json(MeResponse {
        success: true,
        user: UserResponse::from(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "citizen@example.in".to_string(),
            password: "longenough".to_string(),
            name: "Citizen".to_string(),
            aadhaar: "123456789012".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_aadhaar = RegisterRequest {
            aadhaar: "12345".to_string(),
            ..ok_clone(&ok)
        };
        assert!(bad_aadhaar.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..ok_clone(&ok)
        };
        assert!(short_password.validate().is_err());
    }

    fn ok_clone(r: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            email: r.email.clone(),
            password: r.password.clone(),
            name: r.name.clone(),
            aadhaar: r.aadhaar.clone(),
        }
    }
}
