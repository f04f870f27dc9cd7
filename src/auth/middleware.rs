//! Authentication middleware
//!
//! Extracts and validates JWT tokens from requests.

use crate::auth::{decode_token, Claims};
use crate::error::AppError;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::{extract::Request, middleware::Next, response::Response};

/// Extract claims from request and stash them in extensions for handlers
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

    let claims = decode_token(token)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Best-effort claims extraction for routes that work with or without a login
/// (e.g. the ballot listing, which marks `hasVoted` only for signed-in users).
pub fn bearer_claims(headers: &HeaderMap) -> Option<Claims> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?
        .strip_prefix("Bearer ")?;

    decode_token(token).ok()
}
