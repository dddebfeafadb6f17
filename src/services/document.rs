use chrono::Utc;
use sea_orm::{sea_query::OnConflict, *};
use uuid::Uuid;

use crate::{
    core::{
        error::AppError,
        lifecycle::{self, PublicationKind, PublicationPatch},
    },
    dtos::publication::{AttachmentView, CreatePublicationRequest, PublicationView, UpdatePublicationRequest},
    entity::{document_attachments, document_editors, documents},
    extractors::current_user::CurrentUser,
    services::publication,
    utils::storage::{FileStore, StoredFile},
};

/// 编辑者登记：同一用户重复保存只刷新 edited_at
pub fn editor_upsert(document_id: Uuid, user_id: Uuid) -> Insert<document_editors::ActiveModel> {
    document_editors::Entity::insert(document_editors::ActiveModel {
        document_id: Set(document_id),
        user_id: Set(user_id),
        edited_at: Set(Utc::now().fixed_offset()),
    })
    .on_conflict(
        OnConflict::columns([document_editors::Column::DocumentId, document_editors::Column::UserId])
            .update_column(document_editors::Column::EditedAt)
            .to_owned(),
    )
}

pub async fn find_document(db: &DatabaseConnection, id: Uuid) -> Result<documents::Model, AppError> {
    documents::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("文档不存在".to_string()))
}

/// 全部文档（含草稿），新建在前
pub async fn list_documents(db: &DatabaseConnection) -> Result<Vec<PublicationView>, AppError> {
    let docs = documents::Entity::find()
        .order_by_desc(documents::Column::CreatedAt)
        .all(db)
        .await?;
    if docs.is_empty() {
        return Ok(Vec::new());
    }

    let editors = document_editors::Entity::find()
        .filter(document_editors::Column::DocumentId.is_in(docs.iter().map(|d| d.id)))
        .order_by_desc(document_editors::Column::EditedAt)
        .all(db)
        .await?;

    publication::with_editors(
        db,
        docs.into_iter().map(Into::into).collect(),
        editors.into_iter().map(Into::into).collect(),
    )
    .await
}

pub async fn get_document(db: &DatabaseConnection, id: Uuid) -> Result<PublicationView, AppError> {
    let doc = find_document(db, id).await?;
    let editors = document_editors::Entity::find()
        .filter(document_editors::Column::DocumentId.eq(id))
        .order_by_desc(document_editors::Column::EditedAt)
        .all(db)
        .await?;

    let views = publication::with_editors(db, vec![doc.into()], editors.into_iter().map(Into::into).collect()).await?;
    views
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("文档不存在".to_string()))
}

pub async fn create_document(
    db: &DatabaseConnection,
    user: &CurrentUser,
    req: CreatePublicationRequest,
) -> Result<PublicationView, AppError> {
    let plan = lifecycle::plan_create(&req.title, req.content, req.status, Utc::now().fixed_offset())?;

    let doc = documents::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(plan.title),
        content: Set(plan.content),
        status: Set(plan.status),
        author_id: Set(user.id),
        published_at: Set(plan.published_at),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // 两条语句不在同一事务里；编辑者记录只是参考信息
    if plan.register_author_as_editor {
        editor_upsert(doc.id, user.id).exec_without_returning(db).await?;
    }

    tracing::info!("📄 Document {} created by {}", doc.id, user.username);
    publication::without_editors(db, doc.into()).await
}

/// 已发布的文档对任何人（包括管理员）都是只读的
pub async fn update_document(
    db: &DatabaseConnection,
    user: &CurrentUser,
    id: Uuid,
    req: UpdatePublicationRequest,
) -> Result<PublicationView, AppError> {
    let doc = find_document(db, id).await?;
    let plan = lifecycle::plan_update(
        PublicationKind::Document,
        doc.status,
        PublicationPatch {
            title: req.title,
            content: req.content,
            status: req.status,
        },
        Utc::now().fixed_offset(),
    )?;

    let mut active: documents::ActiveModel = doc.into();
    if let Some(title) = plan.title {
        active.title = Set(title);
    }
    if let Some(content) = plan.content {
        active.content = Set(content);
    }
    if let Some(status) = plan.status {
        active.status = Set(status);
    }
    if let Some(published_at) = plan.published_at {
        active.published_at = Set(published_at);
    }
    let updated = active.update(db).await?;

    editor_upsert(id, user.id).exec_without_returning(db).await?;

    publication::without_editors(db, updated.into()).await
}

/// 作者或管理员可删。附件文件尽力删除，编辑者与附件记录随文档级联删除。
pub async fn delete_document(
    db: &DatabaseConnection,
    files: &FileStore,
    user: &CurrentUser,
    id: Uuid,
) -> Result<(), AppError> {
    let doc = find_document(db, id).await?;
    user.ensure_can_manage(doc.author_id, "无权删除此文档")?;

    let attachments = document_attachments::Entity::find()
        .filter(document_attachments::Column::DocumentId.eq(id))
        .all(db)
        .await?;
    for a in &attachments {
        files.remove_best_effort(&a.url).await;
    }

    documents::Entity::delete_by_id(id).exec(db).await?;
    tracing::info!("🗑️ Document {} deleted by {}", id, user.username);
    Ok(())
}

pub async fn list_attachments(db: &DatabaseConnection, document_id: Uuid) -> Result<Vec<AttachmentView>, AppError> {
    let rows = document_attachments::Entity::find()
        .filter(document_attachments::Column::DocumentId.eq(document_id))
        .order_by_desc(document_attachments::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// 文件已写入磁盘后登记附件
pub async fn record_attachment(
    db: &DatabaseConnection,
    document_id: Uuid,
    filename: String,
    stored: StoredFile,
) -> Result<AttachmentView, AppError> {
    let row = document_attachments::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(document_id),
        filename: Set(filename),
        url: Set(stored.url),
        size: Set(stored.size as i64),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::enums::PublicationStatus,
        extractors::current_user::{admin, member},
        services::user::test_user,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn doc(author_id: Uuid, status: PublicationStatus) -> documents::Model {
        let now = Utc::now().fixed_offset();
        documents::Model {
            id: Uuid::new_v4(),
            title: "T".to_string(),
            content: "C".to_string(),
            status,
            author_id,
            created_at: now,
            published_at: (status == PublicationStatus::Published).then_some(now),
        }
    }

    fn one_row() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    #[test]
    fn editor_upsert_updates_instead_of_duplicating() {
        let sql = editor_upsert(Uuid::new_v4(), Uuid::new_v4())
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"ON CONFLICT ("document_id", "user_id")"#));
        assert!(sql.contains(r#"DO UPDATE SET "edited_at""#));
    }

    #[tokio::test]
    async fn published_document_rejects_update_even_for_admin() {
        let author = Uuid::new_v4();
        let published = doc(author, PublicationStatus::Published);
        let id = published.id;

        // 只准备了查询结果，若真的去写库会因缺少 mock 数据而报 DbErr 而不是 Forbidden
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[published]])
            .into_connection();

        let err = update_document(
            &db,
            &admin(Uuid::new_v4()),
            id,
            UpdatePublicationRequest {
                title: Some("new".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        match err {
            AppError::Forbidden(msg) => assert_eq!(msg, "已发布的文档不能修改"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn draft_update_records_editor_and_publishes() {
        let author = Uuid::new_v4();
        let draft = doc(author, PublicationStatus::Draft);
        let mut published = draft.clone();
        published.status = PublicationStatus::Published;
        published.published_at = Some(Utc::now().fixed_offset());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[draft.clone()]])
            .append_query_results([[published.clone()]])
            .append_query_results([[test_user(author, "a", Some("甲"))]])
            .append_exec_results([one_row()])
            .into_connection();

        let view = update_document(
            &db,
            &member(author),
            draft.id,
            UpdatePublicationRequest {
                status: Some(PublicationStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(view.status, PublicationStatus::Published);
        assert!(view.published_at.is_some());
        assert_eq!(view.title, "T");
        assert_eq!(view.author.name, "甲");
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<documents::Model>::new()])
            .into_connection();
        let err = update_document(&db, &member(Uuid::new_v4()), Uuid::new_v4(), Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn draft_creation_registers_author_as_editor() {
        let author = Uuid::new_v4();
        let created = doc(author, PublicationStatus::Draft);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[created.clone()]])
            .append_query_results([[test_user(author, "a", None)]])
            .append_exec_results([one_row()])
            .into_connection();

        let view = create_document(
            &db,
            &member(author),
            CreatePublicationRequest {
                title: "T".into(),
                content: Some("C".into()),
                status: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(view.id, created.id);
        assert_eq!(view.author.name, "a");
    }

    #[tokio::test]
    async fn stranger_cannot_delete_document() {
        let author = Uuid::new_v4();
        let existing = doc(author, PublicationStatus::Draft);
        let dir = tempfile::tempdir().unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing.clone()]])
            .into_connection();

        let err = delete_document(&db, &FileStore::new(dir.path()), &member(Uuid::new_v4()), existing.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "无权删除此文档"));
    }

    #[tokio::test]
    async fn admin_deletes_document_and_its_attachment_files() {
        let author = Uuid::new_v4();
        let existing = doc(author, PublicationStatus::Published);
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"%PDF"))]);
        let stored = store
            .save_stream(Some("documents"), "a.pdf", body, None)
            .await
            .unwrap();

        let attachment = document_attachments::Model {
            id: Uuid::new_v4(),
            document_id: existing.id,
            filename: "a.pdf".into(),
            url: stored.url.clone(),
            size: 4,
            created_at: Utc::now().fixed_offset(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing.clone()]])
            .append_query_results([[attachment]])
            .append_exec_results([one_row()])
            .into_connection();

        delete_document(&db, &store, &admin(Uuid::new_v4()), existing.id)
            .await
            .unwrap();
        assert!(!store.resolve(&stored.url).unwrap().exists());
    }

    #[tokio::test]
    async fn list_attaches_editor_names() {
        let author = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let d = doc(author, PublicationStatus::Draft);
        let edit = document_editors::Model {
            document_id: d.id,
            user_id: editor,
            edited_at: Utc::now().fixed_offset(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[d.clone()]])
            .append_query_results([[edit]])
            .append_query_results([vec![
                test_user(author, "author", None),
                test_user(editor, "editor", Some("编辑")),
            ]])
            .into_connection();

        let list = list_documents(&db).await.unwrap();
        assert_eq!(list.len(), 1);
        let editors = list[0].editors.as_ref().unwrap();
        assert_eq!(editors.len(), 1);
        assert_eq!(editors[0].name, "编辑");
        assert_eq!(list[0].author.name, "author");
    }
}
