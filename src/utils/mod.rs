pub mod cache;
pub mod limiter;
pub mod storage;

/// 限流宏：超限时直接从 Handler 返回 429。
/// 用法: rate_limit!(&state.redis, limiter::LOGIN, &subject);
#[macro_export]
macro_rules! rate_limit {
    ($redis:expr, $rule:expr, $subject:expr) => {
        if let Err(e) = $crate::utils::limiter::check_rate_limit($redis, $rule, $subject).await {
            return Err(e);
        }
    };
}
