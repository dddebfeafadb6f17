use std::collections::HashMap;

use sea_orm::{sea_query::Expr, *};
use uuid::Uuid;

use crate::{
    core::{enums::FileKind, error::AppError},
    dtos::material::{CategoryView, CreateCategoryRequest, MaterialView},
    entity::{categories, materials},
    extractors::current_user::CurrentUser,
    services::user::{display_names, name_of},
    utils::storage::{self, FileStore, StoredFile},
};

/// 下载响应需要的全部内容
pub struct Download {
    pub filename: String,
    pub mime: &'static str,
    pub size: u64,
    /// 已打开、尚未读取的文件，由调用方分块送出
    pub file: tokio::fs::File,
}

/// 板块删除规则：所有者或管理员；非管理员在有他人上传的资料时也不能删
pub fn check_category_delete(
    user: &CurrentUser,
    creator_id: Uuid,
    uploader_ids: &[Uuid],
) -> Result<(), AppError> {
    user.ensure_can_manage(creator_id, "无权删除此板块")?;
    if !user.is_admin() && uploader_ids.iter().any(|id| *id != user.id) {
        return Err(AppError::Forbidden("板块中有他人上传的文件，无法删除".to_string()));
    }
    Ok(())
}

pub async fn find_category(db: &DatabaseConnection, id: Uuid) -> Result<categories::Model, AppError> {
    categories::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("板块不存在".to_string()))
}

async fn find_material(db: &DatabaseConnection, id: Uuid) -> Result<materials::Model, AppError> {
    materials::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("资料不存在".to_string()))
}

pub async fn material_counts(db: &DatabaseConnection) -> Result<HashMap<Uuid, u64>, AppError> {
    let rows: Vec<(Uuid, i64)> = materials::Entity::find()
        .select_only()
        .column(materials::Column::CategoryId)
        .column_as(Expr::col(materials::Column::Id).count(), "count")
        .group_by(materials::Column::CategoryId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
}

pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<CategoryView>, AppError> {
    let rows = categories::Entity::find()
        .order_by_desc(categories::Column::CreatedAt)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let counts = material_counts(db).await?;
    let names = display_names(db, rows.iter().map(|c| c.creator_id)).await?;

    Ok(rows
        .into_iter()
        .map(|c| CategoryView {
            creator_name: name_of(&names, c.creator_id),
            material_count: counts.get(&c.id).copied().unwrap_or(0),
            id: c.id,
            name: c.name,
            description: c.description,
            kind: c.kind,
            creator_id: c.creator_id,
            created_at: c.created_at,
        })
        .collect())
}

pub async fn create_category(
    db: &DatabaseConnection,
    user: &CurrentUser,
    req: CreateCategoryRequest,
) -> Result<CategoryView, AppError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("板块名称不能为空".to_string()));
    }

    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(req.description.unwrap_or_default()),
        kind: Set(req.kind.unwrap_or_default()),
        creator_id: Set(user.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("📁 Category {} created by {}", category.name, user.username);
    let names = display_names(db, [user.id]).await?;
    Ok(CategoryView {
        creator_name: name_of(&names, user.id),
        material_count: 0,
        id: category.id,
        name: category.name,
        description: category.description,
        kind: category.kind,
        creator_id: category.creator_id,
        created_at: category.created_at,
    })
}

/// 先尽力删除磁盘文件，再由外键级联删除资料记录
pub async fn delete_category(
    db: &DatabaseConnection,
    files: &FileStore,
    user: &CurrentUser,
    id: Uuid,
) -> Result<(), AppError> {
    let category = find_category(db, id).await?;
    let children = materials::Entity::find()
        .filter(materials::Column::CategoryId.eq(id))
        .all(db)
        .await?;

    let uploaders: Vec<Uuid> = children.iter().map(|m| m.uploader_id).collect();
    check_category_delete(user, category.creator_id, &uploaders)?;

    for m in &children {
        files.remove_best_effort(&m.file_url).await;
    }
    categories::Entity::delete_by_id(id).exec(db).await?;

    tracing::info!(
        "🗑️ Category {} deleted by {} ({} materials)",
        category.name,
        user.username,
        children.len()
    );
    Ok(())
}

/// 指定板块时只列该板块
pub async fn list_materials(
    db: &DatabaseConnection,
    category_id: Option<Uuid>,
) -> Result<Vec<MaterialView>, AppError> {
    let mut query = materials::Entity::find().order_by_desc(materials::Column::CreatedAt);
    if let Some(category_id) = category_id {
        query = query.filter(materials::Column::CategoryId.eq(category_id));
    }
    let rows = query.all(db).await?;
    let names = display_names(db, rows.iter().map(|m| m.uploader_id)).await?;
    Ok(rows.into_iter().map(|m| material_view(m, &names)).collect())
}

fn material_view(m: materials::Model, names: &HashMap<Uuid, String>) -> MaterialView {
    MaterialView {
        uploader_name: name_of(names, m.uploader_id),
        id: m.id,
        title: m.title,
        file_url: m.file_url,
        file_type: m.file_type,
        file_size: m.file_size,
        category_id: m.category_id,
        uploader_id: m.uploader_id,
        created_at: m.created_at,
    }
}

/// 文件已落盘后登记资料
pub async fn record_material(
    db: &DatabaseConnection,
    user: &CurrentUser,
    category_id: Uuid,
    title: String,
    mime: &str,
    stored: StoredFile,
) -> Result<MaterialView, AppError> {
    let material = materials::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        file_url: Set(stored.url),
        file_type: Set(FileKind::from_mime(mime)),
        file_size: Set(stored.size as i64),
        uploader_id: Set(user.id),
        category_id: Set(category_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("📤 Material {} uploaded by {}", material.id, user.username);
    let names = display_names(db, [user.id]).await?;
    Ok(material_view(material, &names))
}

pub async fn delete_material(
    db: &DatabaseConnection,
    files: &FileStore,
    user: &CurrentUser,
    id: Uuid,
) -> Result<(), AppError> {
    let material = find_material(db, id).await?;
    user.ensure_can_manage(material.uploader_id, "无权删除此资料")?;
    files.remove_best_effort(&material.file_url).await;
    materials::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn download_material(
    db: &DatabaseConnection,
    files: &FileStore,
    id: Uuid,
) -> Result<Download, AppError> {
    let material = find_material(db, id).await?;
    let opened = files.open(&material.file_url).await?;
    Ok(Download {
        filename: storage::download_name(&material.title, &material.file_url),
        mime: storage::mime_for(&material.file_url),
        size: opened.size,
        file: opened.file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::current_user::{admin, member};
    use chrono::Utc;
    use futures::TryStreamExt;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn category(creator_id: Uuid) -> categories::Model {
        categories::Model {
            id: Uuid::new_v4(),
            name: "党史学习".to_string(),
            description: String::new(),
            kind: Default::default(),
            creator_id,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn material(category_id: Uuid, uploader_id: Uuid, file_url: &str) -> materials::Model {
        materials::Model {
            id: Uuid::new_v4(),
            title: "讲稿.docx".to_string(),
            file_url: file_url.to_string(),
            file_type: FileKind::Document,
            file_size: 4,
            uploader_id,
            category_id,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn category_delete_rule() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(check_category_delete(&member(creator), creator, &[creator, creator]).is_ok());
        assert!(matches!(
            check_category_delete(&member(creator), creator, &[creator, other]),
            Err(AppError::Forbidden(m)) if m == "板块中有他人上传的文件，无法删除"
        ));
        assert!(matches!(
            check_category_delete(&member(other), creator, &[]),
            Err(AppError::Forbidden(m)) if m == "无权删除此板块"
        ));
        assert!(check_category_delete(&admin(other), creator, &[creator, other]).is_ok());
    }

    #[tokio::test]
    async fn creator_blocked_by_foreign_materials() {
        let creator = Uuid::new_v4();
        let c = category(creator);
        let dir = tempfile::tempdir().unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[c.clone()]])
            .append_query_results([[material(c.id, Uuid::new_v4(), "/uploads/x.docx")]])
            .into_connection();

        let err = delete_category(&db, &FileStore::new(dir.path()), &member(creator), c.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_removes_category_and_unlinks_files() {
        let c = category(Uuid::new_v4());
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let mut stored = Vec::new();
        for name in ["a.docx", "b.pdf"] {
            let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"data"))]);
            stored.push(store.save_stream(None, name, body, None).await.unwrap());
        }

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[c.clone()]])
            .append_query_results([vec![
                material(c.id, Uuid::new_v4(), &stored[0].url),
                material(c.id, Uuid::new_v4(), &stored[1].url),
                // 已经丢失的文件不影响删除
                material(c.id, Uuid::new_v4(), "/uploads/missing.pdf"),
            ]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        delete_category(&db, &store, &admin(Uuid::new_v4()), c.id).await.unwrap();
        assert!(stored.iter().all(|s| !store.resolve(&s.url).unwrap().exists()));
    }

    #[tokio::test]
    async fn stranger_cannot_delete_material() {
        let m = material(Uuid::new_v4(), Uuid::new_v4(), "/uploads/x.docx");
        let dir = tempfile::tempdir().unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[m.clone()]])
            .into_connection();

        let err = delete_material(&db, &FileStore::new(dir.path()), &member(Uuid::new_v4()), m.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn download_uses_stored_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"PK"))]);
        let stored = store.save_stream(None, "slides.pptx", body, None).await.unwrap();

        let mut m = material(Uuid::new_v4(), Uuid::new_v4(), &stored.url);
        m.title = "第三讲".to_string();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[m.clone()]])
            .into_connection();

        let download = download_material(&db, &store, m.id).await.unwrap();
        assert_eq!(download.filename, "第三讲.pptx");
        assert_eq!(
            download.mime,
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
        assert_eq!(download.size, 2);
        let parts: Vec<bytes::Bytes> = storage::chunks(download.file).try_collect().await.unwrap();
        assert_eq!(parts.concat(), b"PK");
    }

    #[tokio::test]
    async fn download_of_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let m = material(Uuid::new_v4(), Uuid::new_v4(), "/uploads/gone.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[m.clone()]])
            .into_connection();
        assert!(matches!(
            download_material(&db, &FileStore::new(dir.path()), m.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
