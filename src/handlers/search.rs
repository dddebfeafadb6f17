use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    core::error::AppError,
    dtos::{response::ApiResponse, search::SearchQuery},
    extractors::current_user::CurrentUser,
    services::search::{self as SearchService, SearchScope},
    state::AppState,
};

/// 全站搜索。`type` 取 all / community / documents / materials，空关键词返回空结果。
pub async fn search(
    _user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let scope = SearchScope::parse(query.scope.as_deref());
    let results = SearchService::search(&state.db, query.q.as_deref(), scope).await?;
    Ok(ApiResponse::with_data(results))
}
