//! Forum route handlers

use crate::auth::Claims;
use crate::error::AppError;
use crate::forum::{Reply, ReplyInput, Topic, TopicInput};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    pub topic: Topic,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicListResponse {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetailResponse {
    pub topic: Topic,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub reply: Reply,
}

/// GET /api/forum/topics
pub async fn list_topics(
    State(state): State<SharedState>,
) -> Result<Json<SuccessResponse<TopicListResponse>>, AppError> {
    let topics = state.forum.list_topics().await?;

    Ok(Json(SuccessResponse::with_data(
        "Topics retrieved",
        TopicListResponse { topics },
    )))
}

/// GET /api/forum/topics/{id}
pub async fn get_topic(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<TopicDetailResponse>>, AppError> {
    let (topic, replies) = state.forum.get_topic(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Topic retrieved",
        TopicDetailResponse { topic, replies },
    )))
}

/// POST /api/forum/topics
pub async fn create_topic(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<TopicInput>,
) -> Result<(StatusCode, Json<SuccessResponse<TopicResponse>>), AppError> {
    let author = author_name(&state, &claims).await?;
    let topic = state.forum.create_topic(claims.sub, &author, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Topic created",
            TopicResponse { topic },
        )),
    ))
}

/// POST /api/forum/topics/{id}/replies
pub async fn add_reply(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(input): Json<ReplyInput>,
) -> Result<(StatusCode, Json<SuccessResponse<ReplyResponse>>), AppError> {
    let author = author_name(&state, &claims).await?;
    let reply = state.forum.add_reply(id, claims.sub, &author, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Reply posted",
            ReplyResponse { reply },
        )),
    ))
}

/// Posts carry the author's display name, resolved from the account record
async fn author_name(state: &SharedState, claims: &Claims) -> Result<String, AppError> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(user.name)
}
