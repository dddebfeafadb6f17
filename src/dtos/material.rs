use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::enums::{CategoryKind, FileKind},
    entity::files,
};

#[derive(Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "板块名称不能为空"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub material_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MaterialView {
    pub id: Uuid,
    pub title: String,
    pub file_url: String,
    pub file_type: FileKind,
    pub file_size: i64,
    pub category_id: Uuid,
    pub uploader_id: Uuid,
    pub uploader_name: String,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: Uuid,
    pub filename: String,
    pub file_url: String,
    pub mime_type: String,
    pub file_size: i64,
    pub uploader_id: Uuid,
    pub created_at: DateTime<FixedOffset>,
}

impl From<files::Model> for FileView {
    fn from(m: files::Model) -> Self {
        Self {
            id: m.id,
            filename: m.filename,
            file_url: m.file_url,
            mime_type: m.mime_type,
            file_size: m.file_size,
            uploader_id: m.uploader_id,
            created_at: m.created_at,
        }
    }
}
