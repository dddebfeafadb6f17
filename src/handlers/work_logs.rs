use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::{
        publication::{CreatePublicationRequest, UpdatePublicationRequest},
        response::ApiResponse,
    },
    extractors::current_user::CurrentUser,
    services::work_log as WorkLogService,
    state::AppState,
};

pub async fn list(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let logs = WorkLogService::list_work_logs(&state.db).await?;
    Ok(ApiResponse::with_data(logs))
}

pub async fn get(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let log = WorkLogService::get_work_log(&state.db, id).await?;
    Ok(ApiResponse::with_data(log))
}

/// 生命周期与文档相同
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePublicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let log = WorkLogService::create_work_log(&state.db, &user, payload).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "创建成功", Some(log)))
}

pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePublicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let log = WorkLogService::update_work_log(&state.db, &user, id, payload).await?;
    Ok(ApiResponse::with_data(log))
}

pub async fn delete(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    WorkLogService::delete_work_log(&state.db, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}
