// src/dtos/user.rs
use crate::dtos::PHONE_REGEX;
use crate::core::enums::UserRole;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::entity::users;

// Deserialize 用于从缓存读回
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub department: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<FixedOffset>,
}

impl From<users::Model> for UserProfile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            department: user.department,
            avatar: user.avatar,
            bio: user.bio,
            phone: user.phone,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// 只更新出现的字段
#[derive(Deserialize, Validate, Default)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 32, message = "昵称过长"))]
    pub nickname: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
    #[validate(regex(path = *PHONE_REGEX, message = "手机号格式不正确"))]
    pub phone: Option<String>,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: Option<String>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub has_api_key: bool,
    pub use_own_api_key: bool,
    /// 前 8 位 + `...`，没有 Key 时为空串
    pub preview: String,
}

impl From<&users::Model> for ApiKeyStatus {
    fn from(user: &users::Model) -> Self {
        let key = user.api_key.as_deref().unwrap_or_default();
        Self {
            has_api_key: !key.is_empty(),
            use_own_api_key: user.use_own_api_key,
            preview: if key.is_empty() {
                String::new()
            } else {
                format!("{}...", key.chars().take(8).collect::<String>())
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveApiKeyRequest {
    pub api_key: Option<String>,
    pub use_own_api_key: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyPreferenceRequest {
    pub use_own_api_key: bool,
}
