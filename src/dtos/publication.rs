use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    core::enums::PublicationStatus,
    dtos::AuthorRef,
    entity::document_attachments,
};

/// 文档与工作日志共用
#[derive(Deserialize, Default)]
pub struct CreatePublicationRequest {
    #[serde(default)]
    pub title: String,
    pub content: Option<String>,
    pub status: Option<PublicationStatus>,
}

#[derive(Deserialize, Default)]
pub struct UpdatePublicationRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PublicationStatus>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub id: Uuid,
    pub name: String,
    pub edited_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicationView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub status: PublicationStatus,
    pub created_at: DateTime<FixedOffset>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub author: AuthorRef,
    /// 创建/更新接口不返回编辑者
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editors: Option<Vec<EditorView>>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub id: Uuid,
    pub filename: String,
    pub url: String,
    pub size: i64,
    pub created_at: DateTime<FixedOffset>,
}

impl From<document_attachments::Model> for AttachmentView {
    fn from(m: document_attachments::Model) -> Self {
        Self {
            id: m.id,
            filename: m.filename,
            url: m.url,
            size: m.size,
            created_at: m.created_at,
        }
    }
}
