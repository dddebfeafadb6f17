//! 文档与工作日志共用的发布生命周期。
//!
//! 两者的表结构不同，但状态规则完全一致：草稿可以反复编辑，
//! 一旦发布就不可再修改（管理员也不行），也没有撤回到草稿的途径。
//! 这里只做决策，不碰数据库；落库由各自的 service 完成。

use sea_orm::prelude::DateTimeWithTimeZone;

use crate::core::{enums::PublicationStatus, error::AppError};

/// 发布物种类，仅用于拼出面向用户的提示语
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationKind {
    Document,
    WorkLog,
}

impl PublicationKind {
    pub fn label(self) -> &'static str {
        match self {
            PublicationKind::Document => "文档",
            PublicationKind::WorkLog => "工作日志",
        }
    }
}

/// 创建时确定的字段
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCreate {
    pub title: String,
    pub content: String,
    pub status: PublicationStatus,
    pub published_at: Option<DateTimeWithTimeZone>,
    /// 草稿创建时作者自动登记为编辑者
    pub register_author_as_editor: bool,
}

/// 更新请求里出现的字段，`None` 表示不改
#[derive(Debug, Clone, Default)]
pub struct PublicationPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PublicationStatus>,
}

/// 更新要写入的字段。`published_at` 外层 `None` 表示不动该列。
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PublicationStatus>,
    pub published_at: Option<Option<DateTimeWithTimeZone>>,
}

pub fn plan_create(
    title: &str,
    content: Option<String>,
    status: Option<PublicationStatus>,
    now: DateTimeWithTimeZone,
) -> Result<PlannedCreate, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("标题不能为空".to_string()));
    }

    let status = status.unwrap_or_default();
    let published = status == PublicationStatus::Published;

    Ok(PlannedCreate {
        title: title.to_string(),
        content: content.unwrap_or_default(),
        status,
        published_at: published.then_some(now),
        register_author_as_editor: !published,
    })
}

pub fn plan_update(
    kind: PublicationKind,
    current: PublicationStatus,
    patch: PublicationPatch,
    now: DateTimeWithTimeZone,
) -> Result<PlannedUpdate, AppError> {
    if current == PublicationStatus::Published {
        return Err(AppError::Forbidden(format!("已发布的{}不能修改", kind.label())));
    }

    let title = match patch.title {
        Some(t) => {
            let t = t.trim().to_string();
            if t.is_empty() {
                return Err(AppError::BadRequest("标题不能为空".to_string()));
            }
            Some(t)
        }
        None => None,
    };

    let published_at = patch
        .status
        .map(|s| (s == PublicationStatus::Published).then_some(now));

    Ok(PlannedUpdate {
        title,
        content: patch.content,
        status: patch.status,
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> DateTimeWithTimeZone {
        Utc::now().fixed_offset()
    }

    #[test]
    fn blank_title_is_rejected_on_create() {
        let err = plan_create("   ", None, None, now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn draft_create_registers_author_without_publish_stamp() {
        let plan = plan_create("  T ", Some("C".into()), None, now()).unwrap();
        assert_eq!(plan.title, "T");
        assert_eq!(plan.status, PublicationStatus::Draft);
        assert!(plan.published_at.is_none());
        assert!(plan.register_author_as_editor);
    }

    #[test]
    fn published_create_stamps_time() {
        let at = now();
        let plan = plan_create("T", None, Some(PublicationStatus::Published), at).unwrap();
        assert_eq!(plan.published_at, Some(at));
        assert_eq!(plan.content, "");
        assert!(!plan.register_author_as_editor);
    }

    #[test]
    fn published_entities_are_locked() {
        for kind in [PublicationKind::Document, PublicationKind::WorkLog] {
            let patch = PublicationPatch {
                title: Some("new".into()),
                ..Default::default()
            };
            let err = plan_update(kind, PublicationStatus::Published, patch, now()).unwrap_err();
            match err {
                AppError::Forbidden(msg) => assert!(msg.contains(kind.label())),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn publishing_a_draft_stamps_published_at() {
        let at = now();
        let patch = PublicationPatch {
            status: Some(PublicationStatus::Published),
            ..Default::default()
        };
        let plan = plan_update(PublicationKind::Document, PublicationStatus::Draft, patch, at).unwrap();
        assert_eq!(plan.published_at, Some(Some(at)));
        assert_eq!(plan.status, Some(PublicationStatus::Published));
    }

    #[test]
    fn content_only_update_leaves_status_columns_alone() {
        let patch = PublicationPatch {
            content: Some("body".into()),
            ..Default::default()
        };
        let plan = plan_update(PublicationKind::WorkLog, PublicationStatus::Draft, patch, now()).unwrap();
        assert_eq!(plan.published_at, None);
        assert_eq!(plan.status, None);
        assert_eq!(plan.content.as_deref(), Some("body"));
    }

    #[test]
    fn saving_as_draft_clears_published_at() {
        let patch = PublicationPatch {
            status: Some(PublicationStatus::Draft),
            ..Default::default()
        };
        let plan = plan_update(PublicationKind::Document, PublicationStatus::Draft, patch, now()).unwrap();
        assert_eq!(plan.published_at, Some(None));
    }
}
