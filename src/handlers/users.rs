use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::{
        response::ApiResponse,
        user::{ApiKeyPreferenceRequest, SaveApiKeyRequest, UpdateProfileRequest},
    },
    extractors::current_user::CurrentUser,
    services::user as UserService,
    state::AppState,
};

/// 获取当前用户资料。优先读缓存，未命中时回源数据库并回填。
///
/// # 参数
/// - `user`: 由令牌解析出的当前用户
/// - `state`: 应用程序状态
///
/// # 返回值
/// - `Ok(impl IntoResponse)`: 用户资料（不含密码哈希与 API Key）
/// - `Err(AppError)`: 用户不存在时 404
pub async fn get_me(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let profile = UserService::get_user_profile(&state, user.id).await?;
    Ok(ApiResponse::with_data(profile))
}

/// 部分更新当前用户资料，未出现的字段保持不变。写库后同步刷新缓存。
///
/// # 参数
/// - `payload`: 可选字段 nickname / department / bio / phone / email
///
/// # 返回值
/// - `Ok(impl IntoResponse)`: 更新后的资料
/// - `Err(AppError)`: 手机号、邮箱格式错误时 400
pub async fn update_me(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let profile = UserService::update_user_profile(&state, user.id, payload).await?;
    Ok(ApiResponse::with_data(profile))
}

/// 只返回 Key 的前缀预览
pub async fn get_api_key(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let status = UserService::api_key_status(&state.db, user.id).await?;
    Ok(ApiResponse::with_data(status))
}

pub async fn save_api_key(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SaveApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = UserService::save_api_key(&state.db, user.id, payload).await?;
    Ok(ApiResponse::with_data(status))
}

pub async fn set_api_key_preference(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ApiKeyPreferenceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = UserService::set_api_key_preference(&state.db, user.id, payload.use_own_api_key).await?;
    Ok(ApiResponse::with_data(status))
}

pub async fn clear_api_key(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let status = UserService::clear_api_key(&state.db, user.id).await?;
    Ok(ApiResponse::with_data(status))
}

/// 管理员把指定用户设为管理员。路由层已由 admin_guard 把关。
pub async fn promote(
    admin: CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = UserService::promote_to_admin(&state, user_id).await?;
    tracing::info!("⬆️ {} promoted {}", admin.username, profile.username);
    Ok(ApiResponse::with_data(profile))
}
