use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use redis::AsyncCommands;
use secrecy::ExposeSecret;

use crate::{
    core::error::AppError,
    extractors::{claims::decode_token, current_user::CurrentUser},
    services::auth::blacklist_key,
    state::AppState,
};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// 黑名单检查。已登出的令牌在剩余有效期内一律 401。
///
/// 没带令牌的请求直接放行，交给 `CurrentUser` 提取器报「未登录」。
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(req.headers()) else {
        return Ok(next.run(req).await);
    };

    let mut redis_conn = state.redis.clone();
    let is_blacklisted: bool = redis_conn
        .exists(blacklist_key(token))
        .await
        .map_err(AppError::RedisError)?;

    if is_blacklisted {
        tracing::warn!("🚫 Blocked blacklisted token");
        return Err(AppError::AuthError("登录已失效，请重新登录".to_string()));
    }

    Ok(next.run(req).await)
}

/// 管理员守卫：令牌必须有效且角色为 admin，否则 403。
/// 角色取自令牌，提升为管理员后需重新登录或刷新令牌才生效。
pub async fn admin_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthError("未登录".to_string()))?;

    let claims = decode_token(state.config.jwt_secret.expose_secret(), token)?;
    let user = CurrentUser::try_from(claims)?;

    if !user.is_admin() {
        tracing::warn!("🚫 Admin access denied: {}", user.username);
        return Err(AppError::Forbidden("需要管理员权限".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn only_bearer_scheme_is_read() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
