use sea_orm::DatabaseConnection;
use redis::aio::ConnectionManager;
use std::{sync::Arc, time::Duration};
use crate::{
    core::{config::Config, constants::CHAT_CONNECT_TIMEOUT_SECS},
    utils::storage::FileStore,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub redis: ConnectionManager,
    /// 全局配置，使用 Arc 包装以实现廉价克隆
    pub config: Arc<Config>,
    pub files: FileStore,
    /// 转发 AI 请求用
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: DatabaseConnection, redis: ConnectionManager, config: Config) -> Result<Self, reqwest::Error> {
        let http = http_client(&config)?;
        Ok(Self {
            db: Arc::new(db),
            redis,
            files: FileStore::new(&config.upload_dir),
            config: Arc::new(config),
            http,
        })
    }
}

/// 只限制连接和单次读取的等待时间，流式回复可以持续任意长
fn http_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CHAT_CONNECT_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(config.chat_timeout_secs))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_clone<T: Clone>() {}

    #[test]
    fn state_stays_clonable() {
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn slow_stream_outlives_read_timeout() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            // 总耗时超过读取超时，但每段间隔都在超时之内
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(600)).await;
                socket.write_all(b"1\r\na\r\n").await.unwrap();
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
        });

        let mut config = Config::for_tests();
        config.chat_timeout_secs = 1;
        let client = http_client(&config).unwrap();
        let body = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "aaa");
    }
}
