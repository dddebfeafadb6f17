use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
};

use crate::{
    core::error::AppError,
    dtos::{
        party_info::{AdminPartyListQuery, PartySearchQuery, PublicPartyInfoQuery, UpsertPartyInfoRequest},
        response::ApiResponse,
    },
    extractors::current_user::CurrentUser,
    services::party_info::{self as PartyInfoService, AdminSort, PartySearch},
    state::AppState,
};

/// 本人的党员信息，全部字段，不受公开开关影响。尚未填写时 data 为 null。
pub async fn get_own(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let info = PartyInfoService::get_own(&state.db, user.id).await?;
    Ok(ApiResponse::with_data(info))
}

/// 整体保存本人的党员信息。
///
/// # 功能说明
/// - 班级为空或「汉字 + 4 位年级」
/// - 政治面貌对应的各阶段日期必须齐全，缺哪个报哪个
/// - 没有记录时新建，已有记录时所有字段整体覆盖
pub async fn upsert(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UpsertPartyInfoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let info = PartyInfoService::upsert(&state.db, user.id, payload).await?;
    Ok(ApiResponse::with_data(info))
}

/// 公开信息，无需登录。未公开的字段置空。
pub async fn get_public(
    State(state): State<AppState>,
    Query(query): Query<PublicPartyInfoQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("缺少用户ID".to_string()))?;
    let info = PartyInfoService::get_public(&state.db, user_id).await?;
    Ok(ApiResponse::with_data(info))
}

/// 按年级或政治面貌查找其他同志
pub async fn search(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<PartySearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let by = PartySearch::parse(query.kind.as_deref(), query.value.as_deref())?;
    let cards = PartyInfoService::search(&state.db, user.id, by).await?;
    Ok(ApiResponse::with_data(cards))
}

/// 管理员总览，路由层已由 admin_guard 把关
pub async fn admin_list(
    _admin: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<AdminPartyListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let sort = AdminSort::parse(query.sort_by.as_deref());
    let rows = PartyInfoService::admin_list(&state.db, sort, query.keyword.as_deref()).await?;
    Ok(ApiResponse::with_data(rows))
}
