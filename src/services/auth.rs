use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::rngs::OsRng;
use redis::AsyncCommands;
use sea_orm::*;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::{
    core::{
        config::{BootstrapAccount, Config},
        constants::*,
        enums::UserRole,
        error::AppError,
    },
    dtos::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    entity::users,
    extractors::claims::decode_token,
    state::AppState,
    utils::limiter::{self, check_rate_limit},
};

#[inline]
fn refresh_key(token: &str) -> String {
    format!("{}{}", REDIS_PREFIX_REFRESH, token)
}
#[inline]
pub fn blacklist_key(token: &str) -> String {
    format!("{}{}", REDIS_PREFIX_BLACKLIST, token)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Hash failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<(), AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::InternalServerError("Auth failed".to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::AuthError("用户名或密码错误".to_string()))
}

/// 签发访问令牌。角色写进令牌，晋升后需重新登录或刷新才生效。
fn generate_access_token(config: &Config, user: &users::Model) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::seconds(config.jwt_expiration)).timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token generation failed: {}", e)))
}

/// 邀请码决定角色；管理员邀请码未配置时只接受普通邀请码
pub fn role_for_invite(config: &Config, invite_code: &str) -> Result<UserRole, AppError> {
    let code = invite_code.trim();
    if let Some(admin_code) = config.admin_invite_code.as_deref() {
        if !admin_code.is_empty() && code == admin_code {
            return Ok(UserRole::Admin);
        }
    }
    if code == config.invite_code {
        return Ok(UserRole::Member);
    }
    Err(AppError::BadRequest("邀请码错误".to_string()))
}

/// 注册。默认昵称为用户名。
pub async fn register(
    db: &DatabaseConnection,
    config: &Config,
    req: RegisterRequest,
) -> Result<RegisterResponse, AppError> {
    let role = role_for_invite(config, &req.invite_code)?;
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("用户名和密码不能为空".to_string()));
    }

    let exists = users::Entity::find()
        .filter(users::Column::Username.eq(&username))
        .one(db)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("用户名已存在".to_string()));
    }

    let new_user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.clone()),
        password_hash: Set(hash_password(&req.password)?),
        nickname: Set(Some(username)),
        role: Set(role.clone()),
        is_active: Set(true),
        use_own_api_key: Set(false),
        ..Default::default()
    };

    // 并发注册同名用户时由唯一索引兜底
    let user = new_user.insert(db).await.map_err(|e| {
        if e.to_string().contains("duplicate key") {
            AppError::Conflict("用户名已存在".to_string())
        } else {
            AppError::DatabaseError(e)
        }
    })?;

    tracing::info!("👤 Registered {} as {}", user.username, role);
    Ok(RegisterResponse { user_id: user.id, role })
}

/// 启动时确保配置里的账号存在：不存在则创建，存在则同步密码和角色
pub async fn ensure_bootstrap_accounts(
    db: &DatabaseConnection,
    accounts: &[BootstrapAccount],
) -> Result<(), AppError> {
    for account in accounts {
        let role: UserRole = account.role.parse().unwrap_or(UserRole::Member);
        let password_hash = hash_password(account.password.expose_secret())?;

        let existing = users::Entity::find()
            .filter(users::Column::Username.eq(&account.username))
            .one(db)
            .await?;

        match existing {
            Some(user) => {
                let mut active: users::ActiveModel = user.into();
                active.password_hash = Set(password_hash);
                active.role = Set(role);
                active.update(db).await?;
                tracing::info!("🔑 Bootstrap account synced: {}", account.username);
            }
            None => {
                users::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    username: Set(account.username.clone()),
                    password_hash: Set(password_hash),
                    nickname: Set(Some(account.name.clone().unwrap_or_else(|| account.username.clone()))),
                    role: Set(role),
                    is_active: Set(true),
                    use_own_api_key: Set(false),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                tracing::info!("🔑 Bootstrap account created: {}", account.username);
            }
        }
    }
    Ok(())
}

/// 用户名 + 密码登录，签发访问令牌并把刷新令牌写入 Redis
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(req.username.trim()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::AuthError("用户名或密码错误".to_string()))?;

    verify_password(&req.password, &user.password_hash)?;

    if !user.is_active {
        return Err(AppError::Forbidden("账号已被停用".to_string()));
    }

    let access_token = generate_access_token(&state.config, &user)?;
    let refresh_token = Uuid::new_v4().to_string();

    let mut redis = state.redis.clone();
    let _: () = redis
        .set_ex(
            refresh_key(&refresh_token),
            user.id.to_string(),
            state.config.refresh_token_expiration as u64,
        )
        .await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        role: user.role,
    })
}

/// 刷新令牌轮换。旧令牌标记为 USED 并保留短暂宽限期，期满后再用即视为重放。
pub async fn refresh(state: &AppState, old_token: String) -> Result<LoginResponse, AppError> {
    let redis_key_old = refresh_key(&old_token);
    let mut redis = state.redis.clone();

    let user_id_raw: Option<String> = redis.get(&redis_key_old).await?;
    let user_id_raw =
        user_id_raw.ok_or_else(|| AppError::AuthError("刷新令牌无效或已过期".to_string()))?;

    let (user_id, is_used) = match user_id_raw.strip_prefix(REDIS_PREFIX_USED) {
        Some(stripped) => (stripped, true),
        None => (user_id_raw.as_str(), false),
    };

    check_rate_limit(&state.redis, limiter::REFRESH, user_id).await?;

    if is_used {
        tracing::warn!("🚨 Refresh token reused! User: {}", user_id);
        return Err(AppError::Conflict("令牌已被使用，请重新登录".to_string()));
    }

    let uid = Uuid::parse_str(user_id)
        .map_err(|_| AppError::InternalServerError("Stored refresh token has bad user id".to_string()))?;
    let user = users::Entity::find_by_id(uid)
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::AuthError("用户不存在".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("账号已被停用".to_string()));
    }

    let used_val = format!("{}{}", REDIS_PREFIX_USED, user_id);
    if let Err(e) = redis
        .set_ex::<_, _, ()>(&redis_key_old, used_val, ROTATION_GRACE_PERIOD)
        .await
    {
        tracing::warn!("⚠️ Failed to mark refresh token used: {}", e);
    }

    let new_access = generate_access_token(&state.config, &user)?;
    let new_refresh = Uuid::new_v4().to_string();

    let _: () = redis
        .set_ex(
            refresh_key(&new_refresh),
            user_id,
            state.config.refresh_token_expiration as u64,
        )
        .await?;

    Ok(LoginResponse {
        access_token: new_access,
        refresh_token: new_refresh,
        role: user.role,
    })
}

/// 登出：令牌在剩余有效期内进入黑名单。无效令牌直接忽略。
pub async fn logout(state: &AppState, token: &str) -> Result<(), AppError> {
    if let Ok(claims) = decode_token(state.config.jwt_secret.expose_secret(), token) {
        let ttl = claims.exp as i64 - Utc::now().timestamp();
        if ttl > 0 {
            let mut redis = state.redis.clone();
            let _: () = redis.set_ex(blacklist_key(token), "logout", ttl as u64).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user_model(username: &str) -> users::Model {
        let now = Utc::now().fixed_offset();
        users::Model {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Member,
            nickname: Some(username.to_string()),
            department: None,
            avatar: None,
            bio: None,
            phone: None,
            email: None,
            api_key: None,
            use_own_api_key: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(invite_code: &str) -> RegisterRequest {
        RegisterRequest {
            username: "zhangsan".to_string(),
            password: "secret123".to_string(),
            invite_code: invite_code.to_string(),
        }
    }

    #[test]
    fn invite_codes_map_to_roles() {
        let mut config = Config::for_tests();
        assert_eq!(role_for_invite(&config, "branch6").unwrap(), UserRole::Member);
        assert!(role_for_invite(&config, "admin6").is_err());

        config.admin_invite_code = Some("admin6".to_string());
        assert_eq!(role_for_invite(&config, " admin6 ").unwrap(), UserRole::Admin);
        assert!(matches!(role_for_invite(&config, "nope"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash).is_ok());
        assert!(matches!(verify_password("wrong", &hash), Err(AppError::AuthError(_))));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_model("zhangsan")]])
            .into_connection();

        let err = register(&db, &Config::for_tests(), request("branch6")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_creates_member_with_nickname() {
        let created = user_model("zhangsan");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .append_query_results([[created.clone()]])
            .into_connection();

        let resp = register(&db, &Config::for_tests(), request("branch6")).await.unwrap();
        assert_eq!(resp.user_id, created.id);
        assert_eq!(resp.role, UserRole::Member);
    }

    #[tokio::test]
    async fn wrong_invite_code_never_touches_the_database() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = register(&db, &Config::for_tests(), request("guess")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
