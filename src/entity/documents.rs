use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::enums::PublicationStatus;

/// 支部文档。发布后标题和正文不可再改。
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
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
    #[sea_orm(has_many = "super::document_editors::Entity")]
    Editors,
    #[sea_orm(has_many = "super::document_attachments::Entity")]
    Attachments,
}

impl Related<super::document_editors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Editors.def()
    }
}

impl Related<super::document_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
