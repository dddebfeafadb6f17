use sea_orm::*;
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::material::FileView,
    entity::files,
    extractors::current_user::CurrentUser,
    utils::storage::{FileStore, StoredFile},
};

pub async fn record_file(
    db: &DatabaseConnection,
    user: &CurrentUser,
    filename: String,
    mime_type: String,
    stored: StoredFile,
) -> Result<FileView, AppError> {
    let row = files::ActiveModel {
        id: Set(Uuid::new_v4()),
        filename: Set(filename),
        file_url: Set(stored.url),
        mime_type: Set(mime_type),
        file_size: Set(stored.size as i64),
        uploader_id: Set(user.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.into())
}

pub async fn delete_file(
    db: &DatabaseConnection,
    store: &FileStore,
    user: &CurrentUser,
    id: Uuid,
) -> Result<(), AppError> {
    let row = files::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("文件不存在".to_string()))?;
    user.ensure_can_manage(row.uploader_id, "无权删除此文件")?;

    store.remove_best_effort(&row.file_url).await;
    files::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::current_user::{admin, member};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn file_row(uploader_id: Uuid) -> files::Model {
        files::Model {
            id: Uuid::new_v4(),
            filename: "合影.jpg".to_string(),
            file_url: "/uploads/1-x-合影.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            file_size: 10,
            uploader_id,
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn owner_or_admin_deletes_file() {
        let owner = Uuid::new_v4();
        let row = file_row(owner);
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row.clone()]])
            .into_connection();
        assert!(matches!(
            delete_file(&db, &store, &member(Uuid::new_v4()), row.id).await,
            Err(AppError::Forbidden(_))
        ));

        for user in [member(owner), admin(Uuid::new_v4())] {
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection();
            assert!(delete_file(&db, &store, &user, row.id).await.is_ok());
        }
    }
}
