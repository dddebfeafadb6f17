use chrono::Utc;
use sea_orm::{sea_query::OnConflict, *};
use uuid::Uuid;

use crate::{
    core::{
        error::AppError,
        lifecycle::{self, PublicationKind, PublicationPatch},
    },
    dtos::publication::{CreatePublicationRequest, PublicationView, UpdatePublicationRequest},
    entity::{work_log_editors, work_logs},
    extractors::current_user::CurrentUser,
    services::publication,
};

fn editor_upsert(work_log_id: Uuid, user_id: Uuid) -> Insert<work_log_editors::ActiveModel> {
    work_log_editors::Entity::insert(work_log_editors::ActiveModel {
        work_log_id: Set(work_log_id),
        user_id: Set(user_id),
        edited_at: Set(Utc::now().fixed_offset()),
    })
    .on_conflict(
        OnConflict::columns([work_log_editors::Column::WorkLogId, work_log_editors::Column::UserId])
            .update_column(work_log_editors::Column::EditedAt)
            .to_owned(),
    )
}

async fn find_work_log(db: &DatabaseConnection, id: Uuid) -> Result<work_logs::Model, AppError> {
    work_logs::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("工作日志不存在".to_string()))
}

pub async fn list_work_logs(db: &DatabaseConnection) -> Result<Vec<PublicationView>, AppError> {
    let logs = work_logs::Entity::find()
        .order_by_desc(work_logs::Column::CreatedAt)
        .all(db)
        .await?;
    if logs.is_empty() {
        return Ok(Vec::new());
    }

    let editors = work_log_editors::Entity::find()
        .filter(work_log_editors::Column::WorkLogId.is_in(logs.iter().map(|l| l.id)))
        .order_by_desc(work_log_editors::Column::EditedAt)
        .all(db)
        .await?;
    publication::with_editors(
        db,
        logs.into_iter().map(Into::into).collect(),
        editors.into_iter().map(Into::into).collect(),
    )
    .await
}

pub async fn get_work_log(db: &DatabaseConnection, id: Uuid) -> Result<PublicationView, AppError> {
    let log = find_work_log(db, id).await?;
    let editors = work_log_editors::Entity::find()
        .filter(work_log_editors::Column::WorkLogId.eq(id))
        .order_by_desc(work_log_editors::Column::EditedAt)
        .all(db)
        .await?;
    let views = publication::with_editors(db, vec![log.into()], editors.into_iter().map(Into::into).collect()).await?;
    views
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("工作日志不存在".to_string()))
}

pub async fn create_work_log(
    db: &DatabaseConnection,
    user: &CurrentUser,
    req: CreatePublicationRequest,
) -> Result<PublicationView, AppError> {
    let plan = lifecycle::plan_create(&req.title, req.content, req.status, Utc::now().fixed_offset())?;

    let log = work_logs::ActiveModel {
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

    if plan.register_author_as_editor {
        editor_upsert(log.id, user.id).exec_without_returning(db).await?;
    }

    publication::without_editors(db, log.into()).await
}

pub async fn update_work_log(
    db: &DatabaseConnection,
    user: &CurrentUser,
    id: Uuid,
    req: UpdatePublicationRequest,
) -> Result<PublicationView, AppError> {
    let log = find_work_log(db, id).await?;
    let plan = lifecycle::plan_update(
        PublicationKind::WorkLog,
        log.status,
        PublicationPatch {
            title: req.title,
            content: req.content,
            status: req.status,
        },
        Utc::now().fixed_offset(),
    )?;

    let mut active: work_logs::ActiveModel = log.into();
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

pub async fn delete_work_log(db: &DatabaseConnection, user: &CurrentUser, id: Uuid) -> Result<(), AppError> {
    let log = find_work_log(db, id).await?;
    user.ensure_can_manage(log.author_id, "无权删除此工作日志")?;
    work_logs::Entity::delete_by_id(id).exec(db).await?;
    tracing::info!("🗑️ Work log {} deleted by {}", id, user.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::enums::PublicationStatus,
        extractors::current_user::{admin, member},
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn published_log(author_id: Uuid) -> work_logs::Model {
        let now = Utc::now().fixed_offset();
        work_logs::Model {
            id: Uuid::new_v4(),
            title: "周例会".to_string(),
            content: "记录".to_string(),
            status: PublicationStatus::Published,
            author_id,
            created_at: now,
            published_at: Some(now),
        }
    }

    #[tokio::test]
    async fn published_work_log_is_read_only() {
        let author = Uuid::new_v4();
        let log = published_log(author);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[log.clone()]])
            .into_connection();

        let err = update_work_log(
            &db,
            &member(author),
            log.id,
            UpdatePublicationRequest {
                content: Some("改".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "已发布的工作日志不能修改"));
    }

    #[tokio::test]
    async fn only_author_or_admin_deletes() {
        let author = Uuid::new_v4();
        let log = published_log(author);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[log.clone()]])
            .into_connection();
        assert!(matches!(
            delete_work_log(&db, &member(Uuid::new_v4()), log.id).await,
            Err(AppError::Forbidden(_))
        ));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[log.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        assert!(delete_work_log(&db, &admin(Uuid::new_v4()), log.id).await.is_ok());
    }

    #[tokio::test]
    async fn blank_title_is_rejected_before_insert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = create_work_log(
            &db,
            &member(Uuid::new_v4()),
            CreatePublicationRequest {
                title: "  ".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
