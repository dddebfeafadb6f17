use axum::{
    body::Body,
    extract::{Json, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    core::error::AppError,
    dtos::{
        chat::{ChatReply, ChatRequest, OptimizeRequest, OptimizedDocument},
        response::ApiResponse,
    },
    extractors::current_user::CurrentUser,
    rate_limit,
    services::chat as ChatService,
    state::AppState,
    utils::limiter,
};

/// AI 助手。
///
/// # 功能说明
/// - Key 优先级：请求携带 > 本人保存且启用 > 系统默认
/// - 系统提示词里附上站内最新的文档、日志、资料和话题
/// - `stream=true`（默认）时原样透传上游的 SSE 流，否则返回 `{reply}`
pub async fn chat(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, AppError> {
    rate_limit!(&state.redis, limiter::CHAT, &user.id.to_string());

    let upstream = ChatService::forward(
        &state,
        user.id,
        &payload.message,
        payload.api_key.as_deref(),
        payload.stream,
    )
    .await?;

    if payload.stream {
        tracing::debug!("💬 Relaying chat stream for {}", user.username);
        return Ok(relay(upstream));
    }

    let reply = ChatService::read_reply(upstream).await?;
    Ok(ApiResponse::with_data(ChatReply { reply }).into_response())
}

/// 导出 PDF 前的排版优化。
///
/// - 标题或内容为空返回 400
/// - 默认流式透传；非流式时返回 `{optimizedContent, title}`，AI 没有给出内容就原样返回正文
pub async fn optimize_pdf(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<OptimizeRequest>,
) -> Result<Response, AppError> {
    rate_limit!(&state.redis, limiter::CHAT, &user.id.to_string());

    let upstream =
        ChatService::optimize_layout(&state, user.id, &payload.title, &payload.content, payload.stream).await?;

    if payload.stream {
        tracing::debug!("📄 Relaying layout stream for {}", user.username);
        return Ok(relay(upstream));
    }

    let optimized_content = ChatService::first_choice(upstream)
        .await?
        .unwrap_or(payload.content);
    Ok(ApiResponse::with_data(OptimizedDocument {
        optimized_content,
        title: payload.title,
    })
    .into_response())
}

/// 原样透传上游的 SSE 流
fn relay(upstream: reqwest::Response) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}
