use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncWriteExt},
};
use uuid::Uuid;

use crate::core::{constants::UPLOAD_URL_PREFIX, error::AppError};

/// 文档附件所在子目录
pub const DOCUMENTS_SUBDIR: &str = "documents";

/// 下载时每次从磁盘读取的字节数
const READ_CHUNK: usize = 64 * 1024;

const MIB: u64 = 1024 * 1024;

/// 上传目录。数据库只保存 `/uploads/...` 形式的 URL，这里负责和磁盘路径互转。
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub url: String,
    pub size: u64,
}

/// 单文件大小限制，超出时用 `message` 拒绝
#[derive(Debug, Clone)]
pub struct SizeLimit {
    pub max_bytes: u64,
    pub message: String,
}

impl SizeLimit {
    pub fn new(max_bytes: u64, message: impl Into<String>) -> Self {
        Self {
            max_bytes,
            message: message.into(),
        }
    }

    /// 提示语里的上限按 MB 取整，随配置变化
    pub fn megabytes(max_bytes: u64, who: &str) -> Self {
        Self::new(max_bytes, format!("文件大小超过限制（{who}最大{}MB）", max_bytes / MIB))
    }
}

/// 打开待下载的文件
#[derive(Debug)]
pub struct OpenedFile {
    pub file: fs::File,
    pub size: u64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.root.join(DOCUMENTS_SUBDIR)).await?;
        tracing::info!("📁 Upload dir ready: {}", self.root.display());
        Ok(())
    }

    /// `{毫秒时间戳}-{uuid}-{原文件名}`，空白替换为 `_`，路径分隔符同样替换
    pub fn stored_name(original: &str) -> String {
        let safe: String = original
            .chars()
            .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{}-{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4(), safe)
    }

    /// 边收边写。超过限制立即中止并删除已写入的部分。
    pub async fn save_stream<S, E>(
        &self,
        subdir: Option<&str>,
        original_name: &str,
        stream: S,
        limit: Option<SizeLimit>,
    ) -> Result<StoredFile, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let name = Self::stored_name(original_name);
        let (dir, url) = match subdir {
            Some(sub) => (self.root.join(sub), format!("{UPLOAD_URL_PREFIX}/{sub}/{name}")),
            None => (self.root.clone(), format!("{UPLOAD_URL_PREFIX}/{name}")),
        };
        fs::create_dir_all(&dir).await?;
        let path = dir.join(&name);

        let mut file = fs::File::create(&path).await?;
        let mut stream = std::pin::pin!(stream);
        let mut size: u64 = 0;

        let written: Result<(), AppError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| AppError::BadRequest(format!("上传数据读取失败: {e}")))?;
                size += chunk.len() as u64;
                if let Some(limit) = &limit {
                    if size > limit.max_bytes {
                        return Err(AppError::BadRequest(limit.message.clone()));
                    }
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = written {
            drop(file);
            remove_path(&path).await;
            return Err(e);
        }

        tracing::debug!("💾 Stored upload {} ({} bytes)", url, size);
        Ok(StoredFile { url, size })
    }

    /// 把 `/uploads/...` 还原成磁盘路径；包含 `..` 等非常规片段时拒绝
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let rel = url.strip_prefix(UPLOAD_URL_PREFIX)?.trim_start_matches('/');
        if rel.is_empty() {
            return None;
        }
        let rel = Path::new(rel);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(rel))
    }

    /// 只打开不读取，内容由 [`chunks`] 分块送出
    pub async fn open(&self, url: &str) -> Result<OpenedFile, AppError> {
        let path = self
            .resolve(url)
            .ok_or_else(|| AppError::NotFound("文件不存在".to_string()))?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("文件不存在".to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok(OpenedFile { file, size })
    }

    /// 删除失败只记日志，不影响数据库记录的删除
    pub async fn remove_best_effort(&self, url: &str) {
        match self.resolve(url) {
            Some(path) => remove_path(&path).await,
            None => tracing::warn!("⚠️ Skip unlink, unrecognised file url: {}", url),
        }
    }
}

async fn remove_path(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("⚠️ Failed to remove file {}: {}", path.display(), e);
    }
}

/// 把文件变成字节流，读到末尾结束
pub fn chunks(file: fs::File) -> impl Stream<Item = std::io::Result<Bytes>> {
    futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, std::io::Error>(Some((Bytes::from(buf), file)))
    })
}

/// 下载文件名：沿用标题，但扩展名以实际存储的文件为准
pub fn download_name(title: &str, file_url: &str) -> String {
    let actual_ext = extension_of(file_url);
    let title_ext = extension_of(title);
    if !title_ext.is_empty() && title_ext == actual_ext {
        return title.to_string();
    }
    let stem = match title.rfind('.') {
        Some(idx) if !title_ext.is_empty() => &title[..idx],
        _ => title,
    };
    format!("{stem}{actual_ext}")
}

/// 小写扩展名，带点；没有扩展名时为空串
fn extension_of(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_lowercase(),
        _ => String::new(),
    }
}

pub fn mime_for(file_url: &str) -> &'static str {
    match extension_of(file_url).as_str() {
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".xls" => "application/vnd.ms-excel",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".ppt" => "application/vnd.ms-powerpoint",
        ".pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".zip" => "application/zip",
        ".rar" => "application/x-rar-compressed",
        ".7z" => "application/x-7z-compressed",
        ".txt" => "text/plain",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".mp4" => "video/mp4",
        ".mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

/// 支持中文文件名
pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename*=UTF-8''{}", urlencoding::encode(filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, TryStreamExt};

    const MB: usize = 1024 * 1024;

    fn upload_body(total: usize) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        let chunk = Bytes::from(vec![0u8; MB]);
        let mut parts: Vec<Result<Bytes, std::io::Error>> = (0..total / MB).map(|_| Ok(chunk.clone())).collect();
        if total % MB != 0 {
            parts.push(Ok(Bytes::from(vec![0u8; total % MB])));
        }
        stream::iter(parts)
    }

    async fn read_back(store: &FileStore, url: &str) -> Result<Vec<u8>, AppError> {
        let opened = store.open(url).await?;
        let parts: Vec<Bytes> = chunks(opened.file).try_collect().await?;
        let body = parts.concat();
        assert_eq!(body.len() as u64, opened.size);
        Ok(body)
    }

    #[tokio::test]
    async fn oversized_member_upload_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store
            .save_stream(None, "big video.mp4", upload_body(60 * MB), Some(SizeLimit::megabytes(50 * MIB, "普通用户")))
            .await
            .unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("50MB")),
            other => panic!("unexpected error: {other:?}"),
        }

        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unlimited_upload_keeps_every_byte() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store
            .save_stream(None, "big video.mp4", upload_body(60 * MB), None)
            .await
            .unwrap();
        assert_eq!(stored.size, 60 * MIB);
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.url.ends_with("-big_video.mp4"));
        let path = store.resolve(&stored.url).unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(fs::metadata(&path).await.unwrap().len(), 60 * MIB);
    }

    #[tokio::test]
    async fn subdir_uploads_can_be_read_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.init().await.unwrap();

        let body = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"%PDF-1.7"))]);
        let stored = store
            .save_stream(Some(DOCUMENTS_SUBDIR), "会议纪要.pdf", body, None)
            .await
            .unwrap();
        assert!(stored.url.starts_with("/uploads/documents/"));
        assert_eq!(read_back(&store, &stored.url).await.unwrap(), b"%PDF-1.7");

        store.remove_best_effort(&stored.url).await;
        assert!(matches!(store.open(&stored.url).await, Err(AppError::NotFound(_))));
        // 重复删除只记日志
        store.remove_best_effort(&stored.url).await;
    }

    #[tokio::test]
    async fn large_files_come_back_in_bounded_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let stored = store
            .save_stream(None, "录像.mp4", upload_body(3 * MB + 17), None)
            .await
            .unwrap();

        let opened = store.open(&stored.url).await.unwrap();
        assert_eq!(opened.size, 3 * MIB + 17);
        let parts: Vec<Bytes> = chunks(opened.file).try_collect().await.unwrap();
        assert!(parts.len() > 1);
        assert!(parts.iter().all(|p| p.len() <= READ_CHUNK));
        assert_eq!(parts.iter().map(Bytes::len).sum::<usize>(), 3 * MB + 17);
    }

    #[test]
    fn limit_message_follows_configured_size() {
        assert_eq!(SizeLimit::megabytes(10 * MIB, "普通用户").message, "文件大小超过限制（普通用户最大10MB）");
        assert_eq!(SizeLimit::new(1, "太大").message, "太大");
    }

    #[test]
    fn traversal_urls_do_not_resolve() {
        let store = FileStore::new("/srv/uploads");
        assert!(store.resolve("/uploads/../etc/passwd").is_none());
        assert!(store.resolve("/static/a.png").is_none());
        assert!(store.resolve("/uploads/").is_none());
        assert_eq!(
            store.resolve("/uploads/documents/a.pdf").unwrap(),
            PathBuf::from("/srv/uploads/documents/a.pdf")
        );
    }

    #[test]
    fn download_name_takes_extension_from_stored_file() {
        assert_eq!(download_name("党课讲义", "/uploads/1-x-a.pdf"), "党课讲义.pdf");
        assert_eq!(download_name("讲义.docx", "/uploads/1-x-a.pdf"), "讲义.pdf");
        assert_eq!(download_name("讲义.PDF", "/uploads/1-x-a.pdf"), "讲义.PDF");
        assert_eq!(download_name("notes", "/uploads/1-x-readme"), "notes");
    }

    #[test]
    fn mime_table_and_disposition() {
        assert_eq!(mime_for("/uploads/a.JPG"), "image/jpeg");
        assert_eq!(mime_for("/uploads/a.7z"), "application/x-7z-compressed");
        assert_eq!(mime_for("/uploads/a.exe"), "application/octet-stream");
        assert_eq!(
            content_disposition("讲义 1.pdf"),
            "attachment; filename*=UTF-8''%E8%AE%B2%E4%B9%89%201.pdf"
        );
    }
}
