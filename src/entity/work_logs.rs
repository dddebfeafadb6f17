use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::enums::PublicationStatus;

/// 工作日志，与文档共用同一套发布规则
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: PublicationStatus,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub published_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::work_log_editors::Entity")]
    Editors,
}

impl Related<super::work_log_editors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Editors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
