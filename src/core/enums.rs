// src/core/enums.rs

use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 用户角色枚举
/// 同时支持：
/// 1. 数据库映射 (SeaORM) - 存为字符串 "admin" / "member"
/// 2. JSON 序列化 (Serde) - 前端交互
/// 3. 字符串转换 (Strum) - 代码逻辑判断
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")] // to_string() 输出小写
#[serde(rename_all = "lowercase")]    // JSON 输出小写
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")] // 映射到数据库 varchar/text
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,

    #[sea_orm(string_value = "member")]
    Member,
}

/// 文档 / 工作日志的发布状态。只能 draft -> published，不可回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString, Default)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PublicationStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,

    #[sea_orm(string_value = "published")]
    Published,
}

/// 资料板块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString, Default)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum CategoryKind {
    #[sea_orm(string_value = "theory")]
    Theory,

    #[default]
    #[sea_orm(string_value = "course")]
    Course,
}

/// 资料文件类型，由上传时的 MIME 推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum FileKind {
    #[sea_orm(string_value = "image")]
    Image,

    #[sea_orm(string_value = "video")]
    Video,

    #[sea_orm(string_value = "document")]
    Document,
}

impl FileKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else {
            FileKind::Document
        }
    }
}

/// 政治面貌。声明顺序即等级顺序，等级决定必填的时间节点。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString, Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PoliticalStatus {
    #[default]
    #[sea_orm(string_value = "群众")]
    #[serde(rename = "群众")]
    #[strum(serialize = "群众")]
    Masses,

    #[sea_orm(string_value = "共青团员")]
    #[serde(rename = "共青团员")]
    #[strum(serialize = "共青团员")]
    LeagueMember,

    #[sea_orm(string_value = "入党积极分子")]
    #[serde(rename = "入党积极分子")]
    #[strum(serialize = "入党积极分子")]
    Activist,

    #[sea_orm(string_value = "预备党员")]
    #[serde(rename = "预备党员")]
    #[strum(serialize = "预备党员")]
    Probationary,

    #[sea_orm(string_value = "党员")]
    #[serde(rename = "党员")]
    #[strum(serialize = "党员")]
    PartyMember,
}

impl PoliticalStatus {
    /// 群众 = 0 ... 党员 = 4
    pub fn rank(self) -> u8 {
        match self {
            PoliticalStatus::Masses => 0,
            PoliticalStatus::LeagueMember => 1,
            PoliticalStatus::Activist => 2,
            PoliticalStatus::Probationary => 3,
            PoliticalStatus::PartyMember => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn political_status_order_matches_rank() {
        assert!(PoliticalStatus::Masses < PoliticalStatus::PartyMember);
        assert_eq!(PoliticalStatus::from_str("预备党员").unwrap().rank(), 3);
        assert_eq!(PoliticalStatus::Activist.to_string(), "入党积极分子");
        assert!(PoliticalStatus::from_str("member").is_err());
    }

    #[test]
    fn file_kind_follows_mime_prefix() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("video/mp4"), FileKind::Video);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Document);
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(UserRole::Member.to_string(), "member");
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
    }
}
