// src/services/user.rs
use std::{collections::HashMap, sync::Arc};

use sea_orm::*;
use uuid::Uuid;

use crate::{
    core::{constants::CACHE_EXPIRE_USER_PROFILE, enums::UserRole, error::AppError},
    dtos::user::{ApiKeyStatus, SaveApiKeyRequest, UpdateProfileRequest, UserProfile},
    entity::users,
    state::AppState,
    utils::cache,
};

pub async fn find_user(db: &DatabaseConnection, user_id: Uuid) -> Result<users::Model, AppError> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("用户不存在".to_string()))
}

/// 一次查询取回一批用户的展示名；查不到的 id 不在结果中
pub async fn display_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, String>, AppError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|u| (u.id, u.display_name())).collect())
}

/// 作者已被删除时显示“未知用户”
pub fn name_of(names: &HashMap<Uuid, String>, id: Uuid) -> String {
    names.get(&id).cloned().unwrap_or_else(|| "未知用户".to_string())
}

/// 读取个人资料，Cache-Aside
pub async fn get_user_profile(state: &AppState, user_id: Uuid) -> Result<UserProfile, AppError> {
    let key = cache::profile_key(user_id);
    let db = Arc::clone(&state.db);

    cache::get_or_fetch(&state.redis, &key, CACHE_EXPIRE_USER_PROFILE, || async move {
        let user = find_user(&db, user_id).await?;
        Ok(user.into())
    })
    .await
}

pub async fn apply_profile_update(
    db: &DatabaseConnection,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<UserProfile, AppError> {
    let user = find_user(db, user_id).await?;
    let mut active: users::ActiveModel = user.into();

    if let Some(nickname) = req.nickname {
        active.nickname = Set(Some(nickname));
    }
    if let Some(department) = req.department {
        active.department = Set(Some(department));
    }
    if let Some(bio) = req.bio {
        active.bio = Set(Some(bio));
    }
    if let Some(phone) = req.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(email) = req.email {
        active.email = Set(Some(email));
    }

    Ok(active.update(db).await?.into())
}

/// 更新个人资料并同步缓存（Write Through）
pub async fn update_user_profile(
    state: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<UserProfile, AppError> {
    let profile = apply_profile_update(&state.db, user_id, req).await?;
    cache::set(&state.redis, &cache::profile_key(user_id), &profile, CACHE_EXPIRE_USER_PROFILE).await;
    Ok(profile)
}

pub async fn api_key_status(db: &DatabaseConnection, user_id: Uuid) -> Result<ApiKeyStatus, AppError> {
    let user = find_user(db, user_id).await?;
    Ok(ApiKeyStatus::from(&user))
}

/// 保存个人 Key；未指定偏好时默认启用
pub async fn save_api_key(
    db: &DatabaseConnection,
    user_id: Uuid,
    req: SaveApiKeyRequest,
) -> Result<ApiKeyStatus, AppError> {
    let user = find_user(db, user_id).await?;
    let mut active: users::ActiveModel = user.into();
    let key = req.api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    active.api_key = Set(key);
    active.use_own_api_key = Set(req.use_own_api_key.unwrap_or(true));
    let user = active.update(db).await?;
    Ok(ApiKeyStatus::from(&user))
}

pub async fn set_api_key_preference(
    db: &DatabaseConnection,
    user_id: Uuid,
    use_own_api_key: bool,
) -> Result<ApiKeyStatus, AppError> {
    let user = find_user(db, user_id).await?;
    let mut active: users::ActiveModel = user.into();
    active.use_own_api_key = Set(use_own_api_key);
    let user = active.update(db).await?;
    Ok(ApiKeyStatus::from(&user))
}

/// 清除后回落到系统默认 Key
pub async fn clear_api_key(db: &DatabaseConnection, user_id: Uuid) -> Result<ApiKeyStatus, AppError> {
    let user = find_user(db, user_id).await?;
    let mut active: users::ActiveModel = user.into();
    active.api_key = Set(None);
    let user = active.update(db).await?;
    Ok(ApiKeyStatus::from(&user))
}

/// 管理员晋升。对方需重新登录或刷新令牌后才拿到新角色。
pub async fn promote_to_admin(state: &AppState, target_id: Uuid) -> Result<UserProfile, AppError> {
    let user = find_user(&state.db, target_id).await?;
    if user.role == UserRole::Admin {
        return Ok(user.into());
    }
    let mut active: users::ActiveModel = user.into();
    active.role = Set(UserRole::Admin);
    let user = active.update(state.db.as_ref()).await?;

    cache::del(&state.redis, &cache::profile_key(target_id)).await;
    Ok(user.into())
}

#[cfg(test)]
pub(crate) fn test_user(id: Uuid, username: &str, nickname: Option<&str>) -> users::Model {
    let now = chrono::Utc::now().fixed_offset();
    users::Model {
        id,
        username: username.to_string(),
        password_hash: "hash".to_string(),
        role: UserRole::Member,
        nickname: nickname.map(str::to_string),
        department: None,
        avatar: None,
        bio: None,
        phone: None,
        email: None,
        api_key: None,
        use_own_api_key: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn nickname_wins_over_username() {
        let id = Uuid::new_v4();
        assert_eq!(test_user(id, "zhang", Some("小张")).display_name(), "小张");
        assert_eq!(test_user(id, "zhang", Some("")).display_name(), "zhang");
        assert_eq!(test_user(id, "zhang", None).display_name(), "zhang");
    }

    #[tokio::test]
    async fn display_names_skip_query_for_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let names = display_names(&db, Vec::new()).await.unwrap();
        assert!(names.is_empty());
        assert_eq!(name_of(&names, Uuid::new_v4()), "未知用户");
    }

    #[tokio::test]
    async fn api_key_preview_hides_the_key() {
        let id = Uuid::new_v4();
        let mut stored = test_user(id, "zhang", None);
        stored.api_key = Some("sk-or-v1-abcdef123456".to_string());
        stored.use_own_api_key = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user(id, "zhang", None)]])
            .append_query_results([[stored]])
            .into_connection();

        let status = save_api_key(
            &db,
            id,
            SaveApiKeyRequest {
                api_key: Some(" sk-or-v1-abcdef123456 ".to_string()),
                use_own_api_key: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            status,
            ApiKeyStatus {
                has_api_key: true,
                use_own_api_key: true,
                preview: "sk-or-v1...".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn profile_patch_keeps_untouched_fields() {
        let id = Uuid::new_v4();
        let mut before = test_user(id, "zhang", Some("小张"));
        before.department = Some("组织部".to_string());
        let mut after = before.clone();
        after.bio = Some("hello".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[before]])
            .append_query_results([[after]])
            .into_connection();

        let profile = apply_profile_update(
            &db,
            id,
            UpdateProfileRequest {
                bio: Some("hello".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(profile.bio.as_deref(), Some("hello"));
        assert_eq!(profile.department.as_deref(), Some("组织部"));
        assert_eq!(profile.nickname.as_deref(), Some("小张"));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .into_connection();
        assert!(matches!(api_key_status(&db, Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }
}
