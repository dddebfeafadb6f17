use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::{
        community::{ContentRequest, CreateTopicRequest},
        response::ApiResponse,
    },
    extractors::current_user::CurrentUser,
    services::community as CommunityService,
    state::AppState,
};

pub async fn list_topics(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let topics = CommunityService::list_topics(&state.db).await?;
    Ok(ApiResponse::with_data(topics))
}

pub async fn create_topic(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    let topic = CommunityService::create_topic(&state.db, &user, &payload.title, payload.description).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "发布成功", Some(topic)))
}

/// 话题详情，回答按时间倒序并带点赞数
pub async fn get_topic(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let topic = CommunityService::get_topic(&state.db, id).await?;
    Ok(ApiResponse::with_data(topic))
}

pub async fn delete_topic(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    CommunityService::delete_topic(&state.db, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}

pub async fn create_answer(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let answer = CommunityService::create_answer(&state.db, &user, topic_id, &payload.content).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "回答成功", Some(answer)))
}

pub async fn delete_answer(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    CommunityService::delete_answer(&state.db, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}

/// 点赞开关：已赞则取消，未赞则点赞
pub async fn toggle_like(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(answer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let state_after = CommunityService::toggle_like(&state.db, &user, answer_id).await?;
    Ok(ApiResponse::with_data(state_after))
}

pub async fn like_state(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(answer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let liked = CommunityService::like_state(&state.db, &user, answer_id).await?;
    Ok(ApiResponse::with_data(liked))
}

pub async fn list_replies(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(answer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let replies = CommunityService::list_replies(&state.db, answer_id).await?;
    Ok(ApiResponse::with_data(replies))
}

pub async fn create_reply(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(answer_id): Path<Uuid>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = CommunityService::create_reply(&state.db, &user, answer_id, &payload.content).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "回复成功", Some(reply)))
}
