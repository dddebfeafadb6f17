use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use secrecy::ExposeSecret;

use crate::{
    core::error::AppError,
    dtos::auth::Claims,
    state::AppState,
};

/// 从 `Authorization: Bearer` 中解析并校验 JWT。
/// 校验失败时请求直接以 401 结束，不会进入 Handler。
impl FromRequestParts<AppState> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::AuthError("未登录".to_string()))?;

        decode_token(state.config.jwt_secret.expose_secret(), bearer.token())
    }
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("⚠️ Token validation failed: {}", e);
            AppError::AuthError("登录已过期，请重新登录".to_string())
        })
}
