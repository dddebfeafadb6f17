use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dtos::AuthorRef;

#[derive(Deserialize)]
pub struct CreateTopicRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
}

/// 回答与回复共用
#[derive(Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author: AuthorRef,
    pub answer_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: Uuid,
    pub content: String,
    pub author: AuthorRef,
    pub like_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author: AuthorRef,
    pub created_at: DateTime<FixedOffset>,
    pub answers: Vec<AnswerView>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: Uuid,
    pub content: String,
    pub author: AuthorRef,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
}
