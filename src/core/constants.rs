// ==========================================
// Redis Key 前缀定义：这些常量用于构建Redis缓存键的前缀部分，确保键名的一致性和可管理性。
// ==========================================

/// Refresh Token 前缀：用于存储刷新令牌的Redis键前缀。
pub const REDIS_PREFIX_REFRESH: &str = "refresh_token:";

/// 黑名单前缀：用于存储已注销或无效令牌的Redis键前缀。
pub const REDIS_PREFIX_BLACKLIST: &str = "blacklist:token:";

/// 已使用 Token 前缀：用于标记已使用过的令牌，防止重复使用。
pub const REDIS_PREFIX_USED: &str = "USED:";

// 用户资料缓存前缀：注意末尾的冒号。
pub const REDIS_PREFIX_USER_PROFILE: &str = "cache:user:profile:";

// ==========================================
// 业务逻辑常量
// ==========================================

/// Token 轮换宽限期（秒）：在令牌轮换期间允许旧令牌继续使用的宽限时间，单位为秒。
pub const ROTATION_GRACE_PERIOD: u64 = 10;

// 用户资料缓存过期时间（24小时）
pub const CACHE_EXPIRE_USER_PROFILE: u64 = 60 * 60 * 24;

/// 文档附件上限：所有角色一致
pub const ATTACHMENT_MAX_SIZE: u64 = 50 * 1024 * 1024;

/// 全局搜索每个分组的结果上限
pub const SEARCH_BUCKET_LIMIT: u64 = 10;

/// 同志搜索结果上限
pub const PARTY_SEARCH_LIMIT: u64 = 50;

/// 文档搜索结果中的正文摘要长度（字符）
pub const SEARCH_EXCERPT_CHARS: usize = 200;

// AI 上下文中各类数据的条数
pub const CHAT_CONTEXT_DOCUMENTS: u64 = 20;
pub const CHAT_CONTEXT_WORK_LOGS: u64 = 20;
pub const CHAT_CONTEXT_MATERIALS: u64 = 50;
pub const CHAT_CONTEXT_TOPICS: u64 = 30;
pub const CHAT_EXCERPT_CHARS: usize = 150;

/// 上传文件在 URL 中的前缀
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// 连接 AI 服务的超时（秒）；读取超时见配置 CHAT_TIMEOUT_SECS，按每次读取计
pub const CHAT_CONNECT_TIMEOUT_SECS: u64 = 10;
