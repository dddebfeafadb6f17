use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use uuid::Uuid;

use crate::core::{constants::REDIS_PREFIX_USER_PROFILE, error::AppError};

pub fn profile_key(user_id: Uuid) -> String {
    format!("{}{}", REDIS_PREFIX_USER_PROFILE, user_id)
}

/// Cache-Aside：先读 Redis，未命中再执行 `fetcher` 并回填。
///
/// Redis 的任何故障都只记日志，降级为直接查库。
pub async fn get_or_fetch<T, F, Fut>(
    manager: &ConnectionManager,
    key: &str,
    ttl_seconds: u64,
    fetcher: F,
) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, AppError>> + Send,
{
    let mut redis = manager.clone();

    match redis.get::<_, Option<String>>(key).await {
        Ok(Some(json_str)) => match serde_json::from_str::<T>(&json_str) {
            Ok(data) => {
                tracing::debug!("✅ Cache hit: {}", key);
                return Ok(data);
            }
            Err(e) => tracing::warn!("⚠️ Cache deserialize failed for {}: {}", key, e),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!("⚠️ Redis get failed for {}: {}", key, e),
    };

    tracing::debug!("🔍 Cache miss, fetching from DB: {}", key);
    let data = fetcher().await?;
    set(manager, key, &data, ttl_seconds).await;

    Ok(data)
}

/// 直接覆盖（Write Through）
pub async fn set<T>(manager: &ConnectionManager, key: &str, data: &T, ttl_seconds: u64)
where
    T: Serialize + Send + Sync,
{
    let mut redis = manager.clone();
    match serde_json::to_string(data) {
        Ok(json_str) => {
            if let Err(e) = redis.set_ex::<_, _, ()>(key, json_str, ttl_seconds).await {
                tracing::warn!("⚠️ Redis set failed for {}: {}", key, e);
            } else {
                tracing::debug!("🔄 Cache updated: {}", key);
            }
        }
        Err(e) => tracing::error!("❌ Serialization failed: {}", e),
    }
}

/// 数据变更但不方便重建缓存值时使用，下次读取自动回源
pub async fn del(manager: &ConnectionManager, key: &str) {
    let mut redis = manager.clone();
    if let Err(e) = redis.del::<_, ()>(key).await {
        tracing::warn!("⚠️ Redis delete failed for {}: {}", key, e);
    } else {
        tracing::debug!("🗑️ Cache deleted: {}", key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_keys_are_prefixed() {
        let id = Uuid::nil();
        assert_eq!(profile_key(id), "cache:user:profile:00000000-0000-0000-0000-000000000000");
    }
}
