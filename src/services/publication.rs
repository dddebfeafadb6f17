//! 文档与工作日志共用的视图拼装：作者名、编辑者列表。

use std::collections::HashMap;

use sea_orm::{prelude::DateTimeWithTimeZone, *};
use uuid::Uuid;

use crate::{
    core::{enums::PublicationStatus, error::AppError},
    dtos::{
        publication::{EditorView, PublicationView},
        AuthorRef,
    },
    entity::{document_editors, documents, work_log_editors, work_logs},
    services::user::{display_names, name_of},
};

/// 两张表结构相同，统一成一行
pub struct PublicationRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub status: PublicationStatus,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub published_at: Option<DateTimeWithTimeZone>,
}

/// 一条编辑记录，`owner_id` 是所属文档或日志
pub struct EditorRow {
    pub owner_id: Uuid,
    pub user_id: Uuid,
    pub edited_at: DateTimeWithTimeZone,
}

impl From<documents::Model> for PublicationRow {
    fn from(d: documents::Model) -> Self {
        Self {
            id: d.id,
            title: d.title,
            content: d.content,
            status: d.status,
            author_id: d.author_id,
            created_at: d.created_at,
            published_at: d.published_at,
        }
    }
}

impl From<work_logs::Model> for PublicationRow {
    fn from(l: work_logs::Model) -> Self {
        Self {
            id: l.id,
            title: l.title,
            content: l.content,
            status: l.status,
            author_id: l.author_id,
            created_at: l.created_at,
            published_at: l.published_at,
        }
    }
}

impl From<document_editors::Model> for EditorRow {
    fn from(e: document_editors::Model) -> Self {
        Self {
            owner_id: e.document_id,
            user_id: e.user_id,
            edited_at: e.edited_at,
        }
    }
}

impl From<work_log_editors::Model> for EditorRow {
    fn from(e: work_log_editors::Model) -> Self {
        Self {
            owner_id: e.work_log_id,
            user_id: e.user_id,
            edited_at: e.edited_at,
        }
    }
}

fn to_view(row: PublicationRow, names: &HashMap<Uuid, String>, editors: Option<Vec<EditorView>>) -> PublicationView {
    PublicationView {
        author: AuthorRef {
            id: row.author_id,
            name: name_of(names, row.author_id),
        },
        id: row.id,
        title: row.title,
        content: row.content,
        status: row.status,
        created_at: row.created_at,
        published_at: row.published_at,
        editors,
    }
}

/// 按所属分组，组内保持传入顺序
pub fn group_editors(editors: Vec<EditorRow>, names: &HashMap<Uuid, String>) -> HashMap<Uuid, Vec<EditorView>> {
    let mut grouped: HashMap<Uuid, Vec<EditorView>> = HashMap::new();
    for e in editors {
        grouped.entry(e.owner_id).or_default().push(EditorView {
            id: e.user_id,
            name: name_of(names, e.user_id),
            edited_at: e.edited_at,
        });
    }
    grouped
}

/// 列表和详情用：带编辑者（最近编辑在前，由查询决定）
pub async fn with_editors(
    db: &DatabaseConnection,
    rows: Vec<PublicationRow>,
    editors: Vec<EditorRow>,
) -> Result<Vec<PublicationView>, AppError> {
    let names = display_names(
        db,
        rows.iter().map(|r| r.author_id).chain(editors.iter().map(|e| e.user_id)),
    )
    .await?;

    let mut grouped = group_editors(editors, &names);
    Ok(rows
        .into_iter()
        .map(|row| {
            let editors = grouped.remove(&row.id).unwrap_or_default();
            to_view(row, &names, Some(editors))
        })
        .collect())
}

/// 创建、更新接口的返回不带编辑者
pub async fn without_editors(db: &DatabaseConnection, row: PublicationRow) -> Result<PublicationView, AppError> {
    let names = display_names(db, [row.author_id]).await?;
    Ok(to_view(row, &names, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user::test_user;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn row(author_id: Uuid) -> PublicationRow {
        let now = Utc::now().fixed_offset();
        PublicationRow {
            id: Uuid::new_v4(),
            title: "支部例会".to_string(),
            content: "内容".to_string(),
            status: PublicationStatus::Draft,
            author_id,
            created_at: now,
            published_at: None,
        }
    }

    #[test]
    fn editors_group_by_owner_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now().fixed_offset();
        let names = HashMap::from([(u1, "甲".to_string())]);

        let grouped = group_editors(
            vec![
                EditorRow { owner_id: a, user_id: u2, edited_at: now },
                EditorRow { owner_id: b, user_id: u1, edited_at: now },
                EditorRow { owner_id: a, user_id: u1, edited_at: now - Duration::hours(1) },
            ],
            &names,
        );
        let a_editors: Vec<&str> = grouped[&a].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(a_editors, ["未知用户", "甲"]);
        assert_eq!(grouped[&b].len(), 1);
    }

    #[tokio::test]
    async fn rows_without_edits_get_an_empty_list() {
        let author = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let (edited, untouched) = (row(author), row(author));
        let edited_id = edited.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user(author, "a", Some("甲")), test_user(editor, "b", None)]])
            .into_connection();

        let views = with_editors(
            &db,
            vec![edited, untouched],
            vec![EditorRow {
                owner_id: edited_id,
                user_id: editor,
                edited_at: Utc::now().fixed_offset(),
            }],
        )
        .await
        .unwrap();

        assert_eq!(views[0].author.name, "甲");
        let first = views[0].editors.as_ref().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, editor);
        assert_eq!(views[1].editors.as_deref().map(<[EditorView]>::len), Some(0));
    }

    #[tokio::test]
    async fn created_view_omits_editors() {
        let author = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user(author, "a", None)]])
            .into_connection();
        let view = without_editors(&db, row(author)).await.unwrap();
        assert!(view.editors.is_none());
        assert_eq!(view.author.id, author);
    }
}
