use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::{constants::ATTACHMENT_MAX_SIZE, error::AppError},
    dtos::{
        publication::{CreatePublicationRequest, UpdatePublicationRequest},
        response::ApiResponse,
    },
    extractors::current_user::CurrentUser,
    handlers::upload::{self, UploadPolicy},
    rate_limit,
    services::document as DocumentService,
    state::AppState,
    utils::{
        limiter,
        storage::{SizeLimit, DOCUMENTS_SUBDIR},
    },
};

/// 文档列表，附带每篇文档的编辑者
pub async fn list(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let docs = DocumentService::list_documents(&state.db).await?;
    Ok(ApiResponse::with_data(docs))
}

pub async fn get(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let doc = DocumentService::get_document(&state.db, id).await?;
    Ok(ApiResponse::with_data(doc))
}

/// 新建文档。
///
/// # 功能说明
/// - 标题去空白后不能为空
/// - 默认草稿；草稿状态下作者自动登记为编辑者
/// - 直接发布时 publishedAt 取创建时间
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePublicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let doc = DocumentService::create_document(&state.db, &user, payload).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "创建成功", Some(doc)))
}

/// 更新草稿。已发布的文档任何人都不能再改，管理员也不例外。
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePublicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let doc = DocumentService::update_document(&state.db, &user, id, payload).await?;
    Ok(ApiResponse::with_data(doc))
}

pub async fn delete(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    DocumentService::delete_document(&state.db, &state.files, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}

pub async fn list_attachments(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attachments = DocumentService::list_attachments(&state.db, id).await?;
    Ok(ApiResponse::with_data(attachments))
}

/// 上传 PDF 附件。
///
/// # 功能说明
/// - 文档必须存在，否则 404（在读取表单之前检查）
/// - 只接受 PDF，所有角色统一 50MB 上限
/// - 文件落在 `uploads/documents/` 下
pub async fn upload_attachment(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, limiter::UPLOAD, &user.id.to_string());

    DocumentService::find_document(&state.db, id).await?;

    let policy = UploadPolicy {
        subdir: Some(DOCUMENTS_SUBDIR),
        limit: Some(SizeLimit::new(ATTACHMENT_MAX_SIZE, "文件大小不能超过50MB")),
        require_pdf: true,
        require_title: false,
    };
    let received = upload::receive(&state.files, multipart, policy).await?;
    let url = received.stored.url.clone();

    match DocumentService::record_attachment(&state.db, id, received.filename, received.stored).await {
        Ok(attachment) => {
            tracing::info!("📎 {} attached {} to document {}", user.username, attachment.filename, id);
            Ok(ApiResponse::with_code(StatusCode::CREATED, "上传成功", Some(attachment)))
        }
        Err(e) => {
            state.files.remove_best_effort(&url).await;
            Err(e)
        }
    }
}
