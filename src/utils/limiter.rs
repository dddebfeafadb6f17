use redis::Script;
use redis::aio::ConnectionManager;
use crate::core::error::AppError;

/// 一条固定窗口限流规则：`window` 秒内最多 `limit` 次
#[derive(Debug, Clone, Copy)]
pub struct RateRule {
    pub action: &'static str,
    pub limit: usize,
    pub window: u64,
}

pub const LOGIN: RateRule = RateRule { action: "login", limit: 5, window: 60 };
pub const REGISTER: RateRule = RateRule { action: "register", limit: 5, window: 60 };
pub const REFRESH: RateRule = RateRule { action: "refresh_token", limit: 10, window: 60 };
pub const CHAT: RateRule = RateRule { action: "chat", limit: 20, window: 60 };
pub const UPLOAD: RateRule = RateRule { action: "upload", limit: 30, window: 60 };

fn counter_key(action: &str, subject: &str) -> String {
    format!("rate_limit:{}:{}", action, subject)
}

/// 原子自增，首次计数时设置过期时间
pub async fn check_rate_limit(
    redis_manager: &ConnectionManager,
    rule: RateRule,
    subject: &str,
) -> Result<(), AppError> {
    let redis_key = counter_key(rule.action, subject);
    let mut conn = redis_manager.clone();

    let script = Script::new(r#"
        local count = redis.call("INCR", KEYS[1])
        if count == 1 then
            redis.call("EXPIRE", KEYS[1], ARGV[1])
        end
        return count
    "#);

    let count: usize = script
        .key(&redis_key)
        .arg(rule.window)
        .invoke_async(&mut conn)
        .await?;

    if count > rule.limit {
        tracing::warn!("⛔ Rate limit exceeded: {} on {} ({}/{})", subject, rule.action, count, rule.limit);
        return Err(AppError::RateLimitExceeded(format!(
            "操作过于频繁，请 {} 秒后再试",
            rule.window
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_namespaced_per_action() {
        assert_eq!(counter_key(LOGIN.action, "zhang"), "rate_limit:login:zhang");
        assert_ne!(counter_key(CHAT.action, "u1"), counter_key(UPLOAD.action, "u1"));
    }
}
