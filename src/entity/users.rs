use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::enums::UserRole;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub nickname: Option<String>,
    pub department: Option<String>,
    pub avatar: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// 用户自己的 AI Key，永远不直接返回给前端
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub use_own_api_key: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// 昵称优先，没有昵称时用用户名
    pub fn display_name(&self) -> String {
        match self.nickname.as_deref() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.username.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::party_infos::Entity")]
    PartyInfo,
}

impl Related<super::party_infos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartyInfo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
