use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{core::enums::PoliticalStatus, entity::party_infos};

fn yes() -> bool {
    true
}

/// 空串与 null 都算未填写；带时间的 ISO 字符串只取日期部分
fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|dt| dt.date_naive()))
        .map(Some)
        .map_err(|_| de::Error::custom(format!("日期格式无效: {raw}")))
}

/// 整体覆盖写入：缺省的公开开关回到默认值，而不是保留旧值
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPartyInfoRequest {
    #[serde(default)]
    pub political_status: PoliticalStatus,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub hometown: String,
    #[serde(default, rename = "wechatQQ")]
    pub wechat_qq: String,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub join_league_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub activist_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub probationary_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub formal_date: Option<NaiveDate>,
    #[serde(default = "yes")]
    pub show_political_status: bool,
    #[serde(default = "yes")]
    pub show_class_name: bool,
    #[serde(default = "yes")]
    pub show_hometown: bool,
    #[serde(default, rename = "showWechatQQ")]
    pub show_wechat_qq: bool,
    #[serde(default = "yes")]
    pub show_join_league_date: bool,
    #[serde(default = "yes")]
    pub show_activist_date: bool,
    #[serde(default = "yes")]
    pub show_probationary_date: bool,
    #[serde(default = "yes")]
    pub show_formal_date: bool,
}

/// 本人视角：全部字段
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfoView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub political_status: PoliticalStatus,
    pub class_name: String,
    pub hometown: String,
    #[serde(rename = "wechatQQ")]
    pub wechat_qq: String,
    pub join_league_date: Option<NaiveDate>,
    pub activist_date: Option<NaiveDate>,
    pub probationary_date: Option<NaiveDate>,
    pub formal_date: Option<NaiveDate>,
    pub show_political_status: bool,
    pub show_class_name: bool,
    pub show_hometown: bool,
    #[serde(rename = "showWechatQQ")]
    pub show_wechat_qq: bool,
    pub show_join_league_date: bool,
    pub show_activist_date: bool,
    pub show_probationary_date: bool,
    pub show_formal_date: bool,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<party_infos::Model> for PartyInfoView {
    fn from(m: party_infos::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            political_status: m.political_status,
            class_name: m.class_name,
            hometown: m.hometown,
            wechat_qq: m.wechat_qq,
            join_league_date: m.join_league_date,
            activist_date: m.activist_date,
            probationary_date: m.probationary_date,
            formal_date: m.formal_date,
            show_political_status: m.show_political_status,
            show_class_name: m.show_class_name,
            show_hometown: m.show_hometown,
            show_wechat_qq: m.show_wechat_qq,
            show_join_league_date: m.show_join_league_date,
            show_activist_date: m.show_activist_date,
            show_probationary_date: m.show_probationary_date,
            show_formal_date: m.show_formal_date,
            updated_at: m.updated_at,
        }
    }
}

/// 公开接口：开关关闭的字段置空，开关本身照常返回
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicPartyInfo {
    pub political_status: Option<PoliticalStatus>,
    pub class_name: Option<String>,
    pub show_political_status: bool,
    pub show_class_name: bool,
}

/// 搜索结果卡片，未公开字段为 null
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartyMemberCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub political_status: Option<PoliticalStatus>,
    pub class_name: Option<String>,
    pub hometown: Option<String>,
    #[serde(rename = "wechatQQ")]
    pub wechat_qq: Option<String>,
    pub join_league_date: Option<NaiveDate>,
    pub activist_date: Option<NaiveDate>,
    pub probationary_date: Option<NaiveDate>,
    pub formal_date: Option<NaiveDate>,
}

/// 管理员视角：忽略所有开关
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminPartyInfoRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub political_status: PoliticalStatus,
    pub class_name: String,
    pub hometown: String,
    #[serde(rename = "wechatQQ")]
    pub wechat_qq: String,
    pub join_league_date: Option<NaiveDate>,
    pub activist_date: Option<NaiveDate>,
    pub probationary_date: Option<NaiveDate>,
    pub formal_date: Option<NaiveDate>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPartyInfoQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct PartySearchQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPartyListQuery {
    pub sort_by: Option<String>,
    pub keyword: Option<String>,
}
