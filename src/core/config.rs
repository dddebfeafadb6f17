use config::{Config as ConfigLoader, Environment};
use dotenvy::dotenv;
use secrecy::SecretString;
use serde::Deserialize;

/// 启动时需要保证存在的账号（取代硬编码的管理员名单）。
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAccount {
    pub username: String,
    pub password: SecretString,
    #[serde(default = "default_bootstrap_role")]
    pub role: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Postgres 连接串（敏感信息）
    #[serde(alias = "DATABASE_URL")]
    pub database_url: SecretString,

    /// Redis 连接串（敏感信息）
    #[serde(alias = "REDIS_URL")]
    pub redis_url: SecretString,

    /// JWT 签名密钥（敏感信息）
    #[serde(alias = "JWT_SECRET")]
    pub jwt_secret: SecretString,

    #[serde(default = "default_port", alias = "SERVER_PORT")]
    pub server_port: u16,

    #[serde(default = "default_host", alias = "SERVER_HOST")]
    pub server_host: String,

    #[serde(default = "default_log", alias = "RUST_LOG")]
    pub rust_log: String,

    #[serde(default = "default_jwt_exp", alias = "JWT_EXPIRATION")]
    pub jwt_expiration: i64,

    #[serde(default = "default_refresh_exp", alias = "REFRESH_TOKEN_EXPIRATION")]
    pub refresh_token_expiration: i64,

    /// 上传文件根目录，数据库中的 URL 形如 `/uploads/<name>`
    #[serde(default = "default_upload_dir", alias = "UPLOAD_DIR")]
    pub upload_dir: String,

    /// 普通成员单文件上传上限（字节），管理员不受限
    #[serde(default = "default_member_upload_limit", alias = "MEMBER_UPLOAD_LIMIT")]
    pub member_upload_limit: u64,

    /// 普通成员注册邀请码
    #[serde(default = "default_invite_code", alias = "INVITE_CODE")]
    pub invite_code: String,

    /// 管理员注册邀请码，未配置时不开放管理员注册
    #[serde(default, alias = "ADMIN_INVITE_CODE")]
    pub admin_invite_code: Option<String>,

    /// JSON 数组：[{username, password, role, name?}]
    #[serde(default, alias = "AUTH_USERS_JSON")]
    pub auth_users_json: Option<String>,

    #[serde(default, alias = "OPENROUTER_API_KEY")]
    pub openrouter_api_key: Option<SecretString>,

    #[serde(default, alias = "OPENAI_API_KEY")]
    pub openai_api_key: Option<SecretString>,

    #[serde(default = "default_chat_api_url", alias = "CHAT_API_URL")]
    pub chat_api_url: String,

    #[serde(default = "default_chat_model", alias = "CHAT_MODEL")]
    pub chat_model: String,

    /// 等待上游单次读取的秒数，流式回复整体不限时
    #[serde(default = "default_chat_timeout", alias = "CHAT_TIMEOUT_SECS")]
    pub chat_timeout_secs: u64,

    /// 作为 HTTP-Referer 发送给 AI 服务
    #[serde(default = "default_app_url", alias = "APP_URL")]
    pub app_url: String,
}

impl Config {
    /// 加载配置：
    /// - 支持 `.env`
    /// - 优先从环境变量加载
    pub fn new() -> Self {
        dotenv().ok();

        // 注意：Environment::default() 会把 `FOO__BAR=baz` 映射到 `foo.bar=baz`
        // 并且 try_parsing(true) 会把 "3000" 解析成数字等类型。
        let builder = ConfigLoader::builder().add_source(Environment::default().try_parsing(true));

        match builder.build() {
            Ok(config) => config
                .try_deserialize()
                .expect("❌ Failed to deserialize configuration"),
            Err(e) => panic!("❌ Failed to build configuration: {e}"),
        }
    }

    /// 解析启动账号列表。格式错误时记录告警并返回空列表。
    pub fn bootstrap_accounts(&self) -> Vec<BootstrapAccount> {
        let Some(raw) = self.auth_users_json.as_deref() else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<BootstrapAccount>>(raw) {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!("⚠️ AUTH_USERS_JSON parse failed, no bootstrap accounts: {}", e);
                Vec::new()
            }
        }
    }

    /// 系统默认的 AI Key：OPENROUTER_API_KEY 优先，其次 OPENAI_API_KEY
    pub fn default_chat_key(&self) -> Option<&SecretString> {
        self.openrouter_api_key
            .as_ref()
            .or(self.openai_api_key.as_ref())
    }
}

// --- 默认值函数 ---
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_log() -> String {
    "info".to_string()
}
fn default_jwt_exp() -> i64 {
    3600
} // 1 hour
fn default_refresh_exp() -> i64 {
    86400 * 7
} // 7 days
fn default_upload_dir() -> String {
    "uploads".to_string()
}
fn default_member_upload_limit() -> u64 {
    50 * 1024 * 1024
}
fn default_invite_code() -> String {
    "branch6".to_string()
}
fn default_chat_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}
fn default_chat_model() -> String {
    "deepseek/deepseek-r1-0528:free".to_string()
}
fn default_chat_timeout() -> u64 {
    120
}
fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_bootstrap_role() -> String {
    "admin".to_string()
}

#[cfg(test)]
impl Config {
    /// 测试用配置，不读取环境变量
    pub fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/test"),
            redis_url: SecretString::from("redis://localhost"),
            jwt_secret: SecretString::from("test-secret"),
            server_port: default_port(),
            server_host: default_host(),
            rust_log: default_log(),
            jwt_expiration: default_jwt_exp(),
            refresh_token_expiration: default_refresh_exp(),
            upload_dir: default_upload_dir(),
            member_upload_limit: default_member_upload_limit(),
            invite_code: default_invite_code(),
            admin_invite_code: None,
            auth_users_json: None,
            openrouter_api_key: None,
            openai_api_key: None,
            chat_api_url: default_chat_api_url(),
            chat_model: default_chat_model(),
            chat_timeout_secs: default_chat_timeout(),
            app_url: default_app_url(),
        }
    }
}
