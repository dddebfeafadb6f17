use std::str::FromStr;

use sea_orm::*;
use uuid::Uuid;

use crate::{
    core::{
        constants::PARTY_SEARCH_LIMIT,
        enums::PoliticalStatus,
        error::AppError,
        party_rules::{check_class_name, check_required_dates, year_prefix, MilestoneDates},
    },
    dtos::party_info::{
        AdminPartyInfoRow, PartyInfoView, PartyMemberCard, PublicPartyInfo, UpsertPartyInfoRequest,
    },
    entity::{party_infos, users},
};

/// 同志搜索的两种方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartySearch {
    /// 班级前两位相同即视为同一年级
    Year(String),
    Stage(PoliticalStatus),
}

impl PartySearch {
    pub fn parse(kind: Option<&str>, value: Option<&str>) -> Result<Self, AppError> {
        let (Some(kind), Some(value)) = (kind, value.map(str::trim).filter(|v| !v.is_empty())) else {
            return Err(AppError::BadRequest("缺少参数".to_string()));
        };
        match kind {
            "year" => Ok(Self::Year(year_prefix(value))),
            "stage" => PoliticalStatus::from_str(value)
                .map(Self::Stage)
                .map_err(|_| AppError::BadRequest(format!("未知的政治面貌: {value}"))),
            _ => Err(AppError::BadRequest("type 只能是 year 或 stage".to_string())),
        }
    }
}

/// 管理员列表的排序字段，未知值按姓名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminSort {
    #[default]
    Name,
    Year,
    Stage,
}

impl AdminSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("year") => Self::Year,
            Some("stage") => Self::Stage,
            _ => Self::Name,
        }
    }
}

pub fn public_view(info: &party_infos::Model) -> PublicPartyInfo {
    PublicPartyInfo {
        political_status: info.show_political_status.then_some(info.political_status),
        class_name: info.show_class_name.then(|| info.class_name.clone()),
        show_political_status: info.show_political_status,
        show_class_name: info.show_class_name,
    }
}

/// 按公开开关逐项置空
pub fn member_card(info: party_infos::Model, user_name: String) -> PartyMemberCard {
    PartyMemberCard {
        id: info.id,
        user_id: info.user_id,
        user_name,
        political_status: info.show_political_status.then_some(info.political_status),
        class_name: info.show_class_name.then_some(info.class_name),
        hometown: info.show_hometown.then_some(info.hometown),
        wechat_qq: info.show_wechat_qq.then_some(info.wechat_qq),
        join_league_date: info.join_league_date.filter(|_| info.show_join_league_date),
        activist_date: info.activist_date.filter(|_| info.show_activist_date),
        probationary_date: info.probationary_date.filter(|_| info.show_probationary_date),
        formal_date: info.formal_date.filter(|_| info.show_formal_date),
    }
}

fn user_name(user: Option<users::Model>) -> String {
    user.map(|u| u.display_name()).unwrap_or_else(|| "未知用户".to_string())
}

pub async fn get_own(db: &DatabaseConnection, user_id: Uuid) -> Result<Option<PartyInfoView>, AppError> {
    let info = party_infos::Entity::find()
        .filter(party_infos::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(info.map(Into::into))
}

/// 整体覆盖写入，先校验再落库
pub async fn upsert(
    db: &DatabaseConnection,
    user_id: Uuid,
    req: UpsertPartyInfoRequest,
) -> Result<PartyInfoView, AppError> {
    let class_name = req.class_name.trim().to_string();
    check_class_name(&class_name)?;
    check_required_dates(
        req.political_status,
        &MilestoneDates {
            join_league_date: req.join_league_date,
            activist_date: req.activist_date,
            probationary_date: req.probationary_date,
            formal_date: req.formal_date,
        },
    )?;

    let existing = party_infos::Entity::find()
        .filter(party_infos::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    let is_new = existing.is_none();
    let mut active = match existing {
        Some(info) => info.into_active_model(),
        None => party_infos::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            ..Default::default()
        },
    };

    active.political_status = Set(req.political_status);
    active.class_name = Set(class_name);
    active.hometown = Set(req.hometown);
    active.wechat_qq = Set(req.wechat_qq);
    active.join_league_date = Set(req.join_league_date);
    active.activist_date = Set(req.activist_date);
    active.probationary_date = Set(req.probationary_date);
    active.formal_date = Set(req.formal_date);
    active.show_political_status = Set(req.show_political_status);
    active.show_class_name = Set(req.show_class_name);
    active.show_hometown = Set(req.show_hometown);
    active.show_wechat_qq = Set(req.show_wechat_qq);
    active.show_join_league_date = Set(req.show_join_league_date);
    active.show_activist_date = Set(req.show_activist_date);
    active.show_probationary_date = Set(req.show_probationary_date);
    active.show_formal_date = Set(req.show_formal_date);
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let saved = if is_new {
        active.insert(db).await?
    } else {
        active.update(db).await?
    };
    Ok(saved.into())
}

/// 没有记录时返回 None
pub async fn get_public(db: &DatabaseConnection, user_id: Uuid) -> Result<Option<PublicPartyInfo>, AppError> {
    let info = party_infos::Entity::find()
        .filter(party_infos::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(info.as_ref().map(public_view))
}

/// 只匹配对应开关公开的记录，并排除自己
pub async fn search(
    db: &DatabaseConnection,
    caller_id: Uuid,
    by: PartySearch,
) -> Result<Vec<PartyMemberCard>, AppError> {
    let condition = match by {
        PartySearch::Year(prefix) => Condition::all()
            .add(party_infos::Column::ClassName.starts_with(prefix))
            .add(party_infos::Column::ShowClassName.eq(true)),
        PartySearch::Stage(status) => Condition::all()
            .add(party_infos::Column::PoliticalStatus.eq(status))
            .add(party_infos::Column::ShowPoliticalStatus.eq(true)),
    };

    let rows = party_infos::Entity::find()
        .find_also_related(users::Entity)
        .filter(condition)
        .filter(party_infos::Column::UserId.ne(caller_id))
        .limit(PARTY_SEARCH_LIMIT)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(info, user)| member_card(info, user_name(user)))
        .collect())
}

pub async fn admin_list(
    db: &DatabaseConnection,
    sort: AdminSort,
    keyword: Option<&str>,
) -> Result<Vec<AdminPartyInfoRow>, AppError> {
    let mut query = party_infos::Entity::find().find_also_related(users::Entity);

    if let Some(kw) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(party_infos::Column::ClassName.contains(kw))
                .add(party_infos::Column::PoliticalStatus.contains(kw))
                .add(party_infos::Column::Hometown.contains(kw))
                .add(users::Column::Nickname.contains(kw))
                .add(users::Column::Username.contains(kw)),
        );
    }

    query = match sort {
        AdminSort::Name => query.order_by_asc(users::Column::Nickname),
        AdminSort::Year => query.order_by_asc(party_infos::Column::ClassName),
        AdminSort::Stage => query.order_by_asc(party_infos::Column::PoliticalStatus),
    };

    let rows = query.all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(info, user)| AdminPartyInfoRow {
            user_name: user_name(user),
            id: info.id,
            user_id: info.user_id,
            political_status: info.political_status,
            class_name: info.class_name,
            hometown: info.hometown,
            wechat_qq: info.wechat_qq,
            join_league_date: info.join_league_date,
            activist_date: info.activist_date,
            probationary_date: info.probationary_date,
            formal_date: info.formal_date,
            updated_at: info.updated_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn date(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn info(user_id: Uuid) -> party_infos::Model {
        let now = Utc::now().fixed_offset();
        party_infos::Model {
            id: Uuid::new_v4(),
            user_id,
            political_status: PoliticalStatus::Probationary,
            class_name: "土木2201".to_string(),
            hometown: "湖南长沙".to_string(),
            wechat_qq: "123456".to_string(),
            join_league_date: date("2018-05-04"),
            activist_date: date("2022-03-01"),
            probationary_date: date("2023-06-30"),
            formal_date: None,
            show_political_status: true,
            show_class_name: false,
            show_hometown: true,
            show_wechat_qq: false,
            show_join_league_date: true,
            show_activist_date: false,
            show_probationary_date: true,
            show_formal_date: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(status: PoliticalStatus) -> UpsertPartyInfoRequest {
        serde_json::from_value(serde_json::json!({
            "politicalStatus": status.to_string(),
            "className": "土木2201",
            "joinLeagueDate": "2018-05-04",
            "activistDate": "2022-03-01",
        }))
        .unwrap()
    }

    #[test]
    fn search_parameters() {
        assert_eq!(
            PartySearch::parse(Some("year"), Some("2201")).unwrap(),
            PartySearch::Year("22".to_string())
        );
        assert_eq!(
            PartySearch::parse(Some("stage"), Some("预备党员")).unwrap(),
            PartySearch::Stage(PoliticalStatus::Probationary)
        );
        assert!(matches!(PartySearch::parse(Some("year"), None), Err(AppError::BadRequest(m)) if m == "缺少参数"));
        assert!(PartySearch::parse(None, Some("22")).is_err());
        assert!(PartySearch::parse(Some("stage"), Some("群主")).is_err());
        assert!(PartySearch::parse(Some("city"), Some("长沙")).is_err());
    }

    #[test]
    fn admin_sort_defaults_to_name() {
        assert_eq!(AdminSort::parse(None), AdminSort::Name);
        assert_eq!(AdminSort::parse(Some("year")), AdminSort::Year);
        assert_eq!(AdminSort::parse(Some("stage")), AdminSort::Stage);
        assert_eq!(AdminSort::parse(Some("whatever")), AdminSort::Name);
    }

    #[test]
    fn hidden_fields_are_nulled_for_others() {
        let card = member_card(info(Uuid::new_v4()), "小李".to_string());
        assert_eq!(card.political_status, Some(PoliticalStatus::Probationary));
        assert_eq!(card.class_name, None);
        assert_eq!(card.hometown.as_deref(), Some("湖南长沙"));
        assert_eq!(card.wechat_qq, None);
        assert_eq!(card.join_league_date, date("2018-05-04"));
        assert_eq!(card.activist_date, None);
        assert_eq!(card.formal_date, None);

        let public = public_view(&info(Uuid::new_v4()));
        assert_eq!(public.political_status, Some(PoliticalStatus::Probationary));
        assert_eq!(public.class_name, None);
        assert!(!public.show_class_name);
    }

    #[test]
    fn wechat_is_private_unless_asked() {
        let req = request(PoliticalStatus::Masses);
        assert!(!req.show_wechat_qq);
        assert!(req.show_hometown && req.show_formal_date);
    }

    #[tokio::test]
    async fn probationary_without_its_date_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = upsert(&db, Uuid::new_v4(), request(PoliticalStatus::Probationary))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("预备党员")));
    }

    #[tokio::test]
    async fn blank_dates_count_as_missing() {
        let req: UpsertPartyInfoRequest = serde_json::from_value(serde_json::json!({
            "politicalStatus": "预备党员",
            "className": "土木2201",
            "joinLeagueDate": "2018-05-04",
            "activistDate": "2022-03-01T00:00:00.000Z",
            "probationaryDate": "",
            "formalDate": null,
        }))
        .unwrap();
        assert_eq!(req.activist_date, date("2022-03-01"));
        assert_eq!(req.probationary_date, None);

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = upsert(&db, Uuid::new_v4(), req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("预备党员时间")));
    }

    #[tokio::test]
    async fn masses_with_blank_formal_date_saves() {
        let user_id = Uuid::new_v4();
        let mut saved = info(user_id);
        saved.political_status = PoliticalStatus::Masses;
        saved.join_league_date = None;
        saved.activist_date = None;
        saved.probationary_date = None;

        let req: UpsertPartyInfoRequest = serde_json::from_value(serde_json::json!({
            "politicalStatus": "群众",
            "className": "土木2201",
            "formalDate": "",
        }))
        .unwrap();
        assert_eq!(req.formal_date, None);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<party_infos::Model>::new()])
            .append_query_results([[saved.clone()]])
            .into_connection();
        let view = upsert(&db, user_id, req).await.unwrap();
        assert_eq!(view.political_status, PoliticalStatus::Masses);
        assert_eq!(view.formal_date, None);
    }

    #[test]
    fn garbage_date_is_rejected_at_parse_time() {
        let parsed = serde_json::from_value::<UpsertPartyInfoRequest>(serde_json::json!({
            "politicalStatus": "群众",
            "formalDate": "昨天",
        }));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn malformed_class_name_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut req = request(PoliticalStatus::Masses);
        req.class_name = "土木221".to_string();
        assert!(matches!(upsert(&db, Uuid::new_v4(), req).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let user_id = Uuid::new_v4();
        let before = info(user_id);
        let mut after = before.clone();
        after.political_status = PoliticalStatus::Activist;
        after.show_class_name = true;
        after.probationary_date = None;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[before]])
            .append_query_results([[after.clone()]])
            .into_connection();

        let view = upsert(&db, user_id, request(PoliticalStatus::Activist)).await.unwrap();
        assert_eq!(view.id, after.id);
        assert_eq!(view.political_status, PoliticalStatus::Activist);
        assert!(view.show_class_name);
    }

    #[tokio::test]
    async fn public_view_of_missing_record_is_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<party_infos::Model>::new()])
            .into_connection();
        assert_eq!(get_public(&db, Uuid::new_v4()).await.unwrap(), None);
    }
}
