//! multipart 上传的公共部分：`file` 字段边收边写盘，其余文本字段顺带收集。

use axum::extract::Multipart;

use crate::{
    core::{config::Config, error::AppError},
    extractors::current_user::CurrentUser,
    utils::storage::{FileStore, SizeLimit, StoredFile},
};

pub struct UploadPolicy {
    pub subdir: Option<&'static str>,
    pub limit: Option<SizeLimit>,
    /// 文档附件只收 PDF
    pub require_pdf: bool,
    /// 为真时成功返回的 `title` 一定有值
    pub require_title: bool,
}

pub struct ReceivedUpload {
    pub stored: StoredFile,
    pub filename: String,
    pub content_type: String,
    pub title: Option<String>,
}

/// 读取整张表单。失败时已写入的文件会被删掉。
pub async fn receive(
    files: &FileStore,
    mut multipart: Multipart,
    policy: UploadPolicy,
) -> Result<ReceivedUpload, AppError> {
    let mut stored: Option<(StoredFile, String, String)> = None;
    let mut title: Option<String> = None;
    let mut title_seen = false;

    let outcome: Result<(), AppError> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("表单解析失败: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" if stored.is_none() => {
                    // 标题在文件之前到达时，不合格就不必再写盘
                    if policy.require_title && title_seen && title.is_none() {
                        return Err(missing_title());
                    }
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    if policy.require_pdf && !content_type.contains("pdf") {
                        return Err(AppError::BadRequest("只能上传PDF文件".to_string()));
                    }
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let file = files
                        .save_stream(policy.subdir, &filename, field, policy.limit.clone())
                        .await?;
                    stored = Some((file, filename, content_type));
                }
                "title" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("表单解析失败: {e}")))?;
                    title = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                    title_seen = true;
                }
                _ => {}
            }
        }
        if stored.is_some() && policy.require_title && title.is_none() {
            return Err(missing_title());
        }
        Ok(())
    }
    .await;

    if let Err(e) = outcome {
        if let Some((file, _, _)) = &stored {
            files.remove_best_effort(&file.url).await;
        }
        return Err(e);
    }

    let (stored, filename, content_type) =
        stored.ok_or_else(|| AppError::BadRequest("缺少文件".to_string()))?;
    Ok(ReceivedUpload {
        stored,
        filename,
        content_type,
        title,
    })
}

fn missing_title() -> AppError {
    AppError::BadRequest("缺少标题".to_string())
}

/// 普通成员受大小限制，管理员不限
pub fn member_limit(user: &CurrentUser, config: &Config) -> Option<SizeLimit> {
    if user.is_admin() {
        None
    } else {
        Some(SizeLimit::megabytes(config.member_upload_limit, "普通用户"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::current_user::{admin, member};
    use axum::{
        body::Body,
        extract::{FromRequest, Request},
        http::header,
    };
    use uuid::Uuid;

    /// (字段名, 文件名, 内容)
    async fn form(fields: &[(&str, Option<&str>, &str)]) -> Multipart {
        let mut body = String::new();
        for (name, filename, value) in fields {
            body.push_str("--BRANCHFORM\r\n");
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str("--BRANCHFORM--\r\n");

        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BRANCHFORM")
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    fn titled(limit: Option<SizeLimit>) -> UploadPolicy {
        UploadPolicy {
            subdir: None,
            limit,
            require_pdf: false,
            require_title: true,
        }
    }

    async fn is_empty(dir: &std::path::Path) -> bool {
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        entries.next_entry().await.unwrap().is_none()
    }

    #[tokio::test]
    async fn blank_title_ahead_of_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let multipart = form(&[("title", None, "  "), ("file", Some("讲义.pdf"), "%PDF-1.7")]).await;

        let err = receive(&store, multipart, titled(None)).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(m) if m == "缺少标题"));
        assert!(is_empty(dir.path()).await);
    }

    #[tokio::test]
    async fn missing_title_after_file_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let multipart = form(&[("file", Some("讲义.pdf"), "%PDF-1.7")]).await;

        let err = receive(&store, multipart, titled(None)).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(m) if m == "缺少标题"));
        assert!(is_empty(dir.path()).await);
    }

    #[tokio::test]
    async fn titled_upload_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let multipart = form(&[("title", None, " 党课讲义 "), ("file", Some("讲义.pdf"), "%PDF-1.7")]).await;

        let received = receive(&store, multipart, titled(None)).await.ok().unwrap();
        assert_eq!(received.title.as_deref(), Some("党课讲义"));
        assert_eq!(received.filename, "讲义.pdf");
        assert_eq!(received.content_type, "application/pdf");
        assert_eq!(received.stored.size, 8);
        assert!(!is_empty(dir.path()).await);
    }

    #[tokio::test]
    async fn configured_limit_is_enforced_with_its_own_message() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut config = Config::for_tests();
        config.member_upload_limit = 4;
        let limit = member_limit(&member(Uuid::new_v4()), &config);
        let multipart = form(&[("title", None, "讲义"), ("file", Some("讲义.pdf"), "%PDF-1.7")]).await;

        let err = receive(&store, multipart, titled(limit)).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(m) if m.starts_with("文件大小超过限制")));
        assert!(is_empty(dir.path()).await);
    }

    #[test]
    fn admins_upload_without_limit() {
        let config = Config::for_tests();
        assert!(member_limit(&admin(Uuid::new_v4()), &config).is_none());

        let limit = member_limit(&member(Uuid::new_v4()), &config).unwrap();
        assert_eq!(limit.max_bytes, config.member_upload_limit);
        assert!(limit.message.contains("50MB"));
    }

    #[test]
    fn limit_message_names_the_configured_size() {
        let mut config = Config::for_tests();
        config.member_upload_limit = 20 * 1024 * 1024;
        let limit = member_limit(&member(Uuid::new_v4()), &config).unwrap();
        assert_eq!(limit.message, "文件大小超过限制（普通用户最大20MB）");
    }
}
