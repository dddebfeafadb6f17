use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::enums::{CategoryKind, FileKind};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub scope: Option<String>,
}

/// 四个分组互不影响，每组最多 10 条
#[derive(Serialize, Debug, Default)]
pub struct SearchResults {
    pub community: Vec<TopicHit>,
    pub documents: Vec<DocumentHit>,
    pub materials: Vec<MaterialHit>,
    pub categories: Vec<CategoryHit>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TopicHit {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author: String,
    pub answer_count: u64,
    pub created_at: DateTime<FixedOffset>,
    pub url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHit {
    pub id: Uuid,
    pub title: String,
    /// 正文前 200 字
    pub content: String,
    pub author: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MaterialHit {
    pub id: Uuid,
    pub title: String,
    pub file_type: FileKind,
    pub file_url: String,
    pub file_size: i64,
    pub category_id: Uuid,
    pub category_name: Option<String>,
    pub category_type: Option<CategoryKind>,
    pub uploader: String,
    pub created_at: DateTime<FixedOffset>,
    pub url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CategoryHit {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_type: CategoryKind,
    pub material_count: u64,
    pub creator: String,
    pub created_at: DateTime<FixedOffset>,
    pub url: String,
}
