use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    core::{enums::UserRole, error::AppError},
    dtos::auth::Claims,
    state::AppState,
};

/// 每个请求解析一次的登录身份，所有权限判断都显式接收它
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// 所有者或管理员
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }

    pub fn ensure_can_manage(&self, owner_id: Uuid, denied: &str) -> Result<(), AppError> {
        if self.can_manage(owner_id) {
            Ok(())
        } else {
            tracing::warn!("🚫 {} denied: {}", self.username, denied);
            Err(AppError::Forbidden(denied.to_string()))
        }
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthError("无效的登录凭证".to_string()))?;
        // 未知角色一律按普通成员处理
        let role = UserRole::from_str(&claims.role).unwrap_or(UserRole::Member);
        Ok(Self {
            id,
            username: claims.username,
            role,
        })
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        CurrentUser::try_from(claims)
    }
}

#[cfg(test)]
pub fn member(id: Uuid) -> CurrentUser {
    CurrentUser {
        id,
        username: "member".to_string(),
        role: UserRole::Member,
    }
}

#[cfg(test)]
pub fn admin(id: Uuid) -> CurrentUser {
    CurrentUser {
        id,
        username: "admin".to_string(),
        role: UserRole::Admin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_or_admin_rule() {
        let owner = Uuid::new_v4();
        assert!(member(owner).can_manage(owner));
        assert!(!member(Uuid::new_v4()).can_manage(owner));
        assert!(admin(Uuid::new_v4()).can_manage(owner));

        let err = member(Uuid::new_v4()).ensure_can_manage(owner, "无权删除此文档").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "无权删除此文档"));
    }

    #[test]
    fn claims_convert_into_principal() {
        let id = Uuid::new_v4();
        let user = CurrentUser::try_from(Claims {
            sub: id.to_string(),
            username: "zhang".into(),
            role: "admin".into(),
            exp: 0,
        })
        .unwrap();
        assert_eq!(user.id, id);
        assert!(user.is_admin());

        let unknown_role = CurrentUser::try_from(Claims {
            sub: id.to_string(),
            username: "li".into(),
            role: "superuser".into(),
            exp: 0,
        })
        .unwrap();
        assert_eq!(unknown_role.role, UserRole::Member);

        assert!(CurrentUser::try_from(Claims {
            sub: "not-a-uuid".into(),
            username: "x".into(),
            role: "member".into(),
            exp: 0,
        })
        .is_err());
    }
}
