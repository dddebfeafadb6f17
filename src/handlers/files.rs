use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::response::ApiResponse,
    extractors::current_user::CurrentUser,
    handlers::upload::{self, UploadPolicy},
    rate_limit,
    services::file as FileService,
    state::AppState,
    utils::limiter,
};

/// 不归属任何板块的独立文件，大小限制与资料上传相同
pub async fn upload(
    user: CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, limiter::UPLOAD, &user.id.to_string());

    let policy = UploadPolicy {
        subdir: None,
        limit: upload::member_limit(&user, &state.config),
        require_pdf: false,
        require_title: false,
    };
    let received = upload::receive(&state.files, multipart, policy).await?;
    let url = received.stored.url.clone();

    match FileService::record_file(&state.db, &user, received.filename, received.content_type, received.stored).await {
        Ok(file) => Ok(ApiResponse::with_code(StatusCode::CREATED, "上传成功", Some(file))),
        Err(e) => {
            state.files.remove_best_effort(&url).await;
            Err(e)
        }
    }
}

pub async fn delete(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    FileService::delete_file(&state.db, &state.files, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}
