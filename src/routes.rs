//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod admin;
mod auth;
mod budget;
mod forum;
mod grievance;
mod transparency;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Public surface: ballot and dashboard reads, auth entry points
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/budgets", get(budget::list_budgets))
        .route("/api/grievances/locations", get(grievance::locations))
        .route("/api/forum/topics", get(forum::list_topics))
        .route("/api/forum/topics/{id}", get(forum::get_topic))
        .route("/api/funds", get(transparency::list_funds))
        .route("/api/funds/departments", get(transparency::department_rollup))
        .route("/api/politicians", get(transparency::list_politicians));

    // Signed-in surface: everything here requires a valid bearer token;
    // role checks happen in the handlers
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/budgets", post(admin::create_budget))
        .route("/api/budgets/{id}/vote", post(budget::toggle_vote))
        .route("/api/budgets/{id}/close", post(admin::close_budget))
        .route("/api/budgets/{id}", delete(admin::delete_budget))
        .route("/api/grievances", post(grievance::submit))
        .route("/api/grievances/mine", get(grievance::mine))
        .route("/api/forum/topics", post(forum::create_topic))
        .route("/api/forum/topics/{id}/replies", post(forum::add_reply))
        .route("/api/funds", post(admin::create_fund))
        .route("/api/politicians", post(admin::create_politician))
        .route("/api/admin/grievances", get(admin::list_grievances))
        .route("/api/admin/grievances/{id}/status", put(admin::update_grievance_status))
        .route("/api/admin/grievances/{id}", delete(admin::delete_grievance))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/role", put(admin::update_user_role))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(stack)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
