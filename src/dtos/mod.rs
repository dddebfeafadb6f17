use std::sync::LazyLock;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

pub mod auth;
pub mod community;
pub mod material;
pub mod party_info;
pub mod publication;
pub mod response;
pub mod search;
pub mod chat;
pub mod user;

pub static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^1[3-9]\d{9}$").expect("Invalid Regex")
});

/// 列表里展示的作者/上传者：`name` 为昵称，没有昵称时是用户名
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: Uuid,
    pub name: String,
}
