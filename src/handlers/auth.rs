// src/handlers/auth.rs
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::{
        auth::{LoginRequest, RefreshRequest, RegisterRequest},
        response::ApiResponse,
    },
    rate_limit,
    services::auth as AuthService,
    state::AppState,
    utils::limiter,
};

/// 邀请码注册处理器。
///
/// # 功能说明
/// - 校验用户名、密码长度（validator）
/// - 按用户名限流，防止批量注册
/// - 邀请码决定角色：普通邀请码为成员，管理员邀请码为管理员
///
/// # 返回值
/// - `201 Created`，data 为新用户的 id 与角色
/// - 邀请码错误 400，用户名重复 409
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // 每个用户名每 60 秒最多 5 次
    rate_limit!(&state.redis, limiter::REGISTER, payload.username.trim());

    let created = AuthService::register(&state.db, &state.config, payload).await?;

    Ok(ApiResponse::with_code(StatusCode::CREATED, "注册成功", Some(created)))
}

/// 用户登录处理器。
///
/// # 功能说明
/// - 按账号限流（防止暴力破解）
/// - 校验用户名与密码，签发访问令牌和刷新令牌
///
/// # 返回值
/// - `Ok`: 令牌对及当前角色
/// - `Err(AppError)`: 账号或密码错误时 401
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    rate_limit!(&state.redis, limiter::LOGIN, payload.username.trim());

    let response = AuthService::login(&state, payload).await?;
    Ok(ApiResponse::with_data(response))
}

/// 令牌刷新处理器。旧的刷新令牌作废，返回新的令牌对。
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = AuthService::refresh(&state, payload.refresh_token).await?;
    Ok(ApiResponse::with_data(response))
}

/// 登出：访问令牌在剩余有效期内进入黑名单
pub async fn logout(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, AppError> {
    AuthService::logout(&state, bearer.token()).await?;
    Ok(ApiResponse::<()>::with_message("已退出登录"))
}
