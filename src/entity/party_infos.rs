use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::enums::PoliticalStatus;

/// 党务信息，与用户一对一。每个敏感字段都有独立的 `show_*` 公开开关。
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "party_infos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub political_status: PoliticalStatus,
    pub class_name: String,
    pub hometown: String,
    pub wechat_qq: String,
    pub join_league_date: Option<Date>,
    pub activist_date: Option<Date>,
    pub probationary_date: Option<Date>,
    pub formal_date: Option<Date>,
    pub show_political_status: bool,
    pub show_class_name: bool,
    pub show_hometown: bool,
    pub show_wechat_qq: bool,
    pub show_join_league_date: bool,
    pub show_activist_date: bool,
    pub show_probationary_date: bool,
    pub show_formal_date: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
