// src/core/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;
use crate::dtos::response::ApiResponse;

/// 应用程序统一错误类型。所有处理器都返回它，状态码的映射只在这里决定一次。
///
/// 通过实现 `IntoResponse` trait，任何 `AppError` 都可以直接转换为HTTP响应，
/// 确保错误信息以统一的格式返回给客户端。
#[derive(Error, Debug)]
pub enum AppError {
    /// 数据库相关错误。包装 SeaORM 的 `DbErr`，自动转换。
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// Redis缓存相关错误。包装 redis crate 的 `RedisError`，自动转换。
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 文件读写错误（上传、下载、删除文件）。
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 输入验证错误。包装 validator crate 的 `ValidationErrors`，自动转换。
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// 业务校验失败，消息中指明具体字段。返回400。
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 认证错误。如未登录、令牌无效、用户名密码错误等。返回401 Unauthorized。
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// 授权错误。如非所有者删除、已发布内容修改等。返回403 Forbidden。
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// 资源未找到错误。返回404 Not Found。
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 资源冲突错误。如用户名已存在等。返回409 Conflict。
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 请求频率限制错误。返回429 Too Many Requests。
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// AI 服务返回非 2xx 或网络失败。
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// 服务器内部错误。用于未预期的错误情况。返回500 Internal Server Error。
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        // 对于内部错误（数据库、Redis、文件、AI），返回通用消息，详细信息只写日志。
        match self {
            AppError::DatabaseError(e) => {
                tracing::error!("❌ Database Error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "数据库服务异常".to_string())
            }
            AppError::RedisError(e) => {
                tracing::error!("❌ Redis Error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "缓存服务异常".to_string())
            }
            AppError::IoError(e) => {
                tracing::error!("❌ IO Error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "文件操作失败".to_string())
            }
            AppError::UpstreamError(msg) => {
                tracing::error!("❌ Upstream Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "AI 服务暂时不可用".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("❌ Internal Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "服务器内部错误".to_string())
            }
            AppError::ValidationError(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimitExceeded(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
        }
    }
}

/// 实现 `IntoResponse` trait，将 `AppError` 转换为统一的 `ApiResponse` 错误响应。
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = self.status_and_message();
        ApiResponse::<()>::with_error(status, &msg).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_details() {
        let (status, msg) = AppError::UpstreamError("401 from provider: bad key".into()).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!msg.contains("bad key"));

        let (status, _) = AppError::IoError(std::io::Error::other("disk")).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_keep_their_message() {
        let (status, msg) = AppError::Forbidden("已发布的文档不能修改".into()).status_and_message();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(msg, "已发布的文档不能修改");

        let (status, _) = AppError::BadRequest("标题不能为空".into()).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = AppError::NotFound("x".into()).status_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
