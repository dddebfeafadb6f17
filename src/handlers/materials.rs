use axum::{
    body::Body,
    extract::{Json, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::{material::CreateCategoryRequest, response::ApiResponse},
    extractors::current_user::CurrentUser,
    handlers::upload::{self, UploadPolicy},
    rate_limit,
    services::material as MaterialService,
    state::AppState,
    utils::{limiter, storage},
};

/// 板块列表，附带创建者名称和资料数量
pub async fn list_categories(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let categories = MaterialService::list_categories(&state.db).await?;
    Ok(ApiResponse::with_data(categories))
}

pub async fn create_category(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = MaterialService::create_category(&state.db, &user, payload).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "创建成功", Some(category)))
}

/// 删除板块及其全部资料。
///
/// # 功能说明
/// - 创建者或管理员可删除
/// - 板块里有他人上传的文件时，只有管理员可以删除
/// - 资料文件尽力删除，失败只记日志
pub async fn delete_category(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    MaterialService::delete_category(&state.db, &state.files, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}

pub async fn category_materials(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let materials = MaterialService::list_materials(&state.db, Some(id)).await?;
    Ok(ApiResponse::with_data(materials))
}

pub async fn list_materials(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let materials = MaterialService::list_materials(&state.db, None).await?;
    Ok(ApiResponse::with_data(materials))
}

/// 向板块上传资料（multipart：`file` + `title`）。
///
/// # 功能说明
/// - 板块不存在 404；缺少标题 400，标题先于文件到达时不会写盘
/// - 普通成员单文件不超过上限，超出时立即中止写入；管理员不限
/// - 文件类型按 MIME 归类为图片、视频或文档
pub async fn upload(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, limiter::UPLOAD, &user.id.to_string());

    MaterialService::find_category(&state.db, category_id).await?;

    let policy = UploadPolicy {
        subdir: None,
        limit: upload::member_limit(&user, &state.config),
        require_pdf: false,
        require_title: true,
    };
    let received = upload::receive(&state.files, multipart, policy).await?;
    let url = received.stored.url.clone();
    let title = received.title.unwrap_or_default();

    match MaterialService::record_material(
        &state.db,
        &user,
        category_id,
        title,
        &received.content_type,
        received.stored,
    )
    .await
    {
        Ok(material) => Ok(ApiResponse::with_code(StatusCode::CREATED, "上传成功", Some(material))),
        Err(e) => {
            state.files.remove_best_effort(&url).await;
            Err(e)
        }
    }
}

pub async fn delete_material(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    MaterialService::delete_material(&state.db, &state.files, &user, id).await?;
    Ok(ApiResponse::<()>::with_message("删除成功"))
}

/// 下载资料：文件名沿用标题，扩展名和 Content-Type 以实际文件为准。
/// 文件按块从磁盘读出，不整体载入内存。
pub async fn download(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let file = MaterialService::download_material(&state.db, &state.files, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, file.mime.to_string()),
            (header::CONTENT_DISPOSITION, storage::content_disposition(&file.filename)),
            (header::CONTENT_LENGTH, file.size.to_string()),
        ],
        Body::from_stream(storage::chunks(file.file)),
    ))
}
