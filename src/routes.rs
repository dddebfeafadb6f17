use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

// 重命名为 app_middleware，避免与 axum::middleware 冲突
use crate::{core::constants::UPLOAD_URL_PREFIX, handlers, middleware as app_middleware, state::AppState};

/// 创建应用路由，所有接口挂在 `/api` 下。
///
/// # 路由结构
/// 1. 公开：`/auth/*` 注册、登录、刷新、登出，`/party-info/public`
/// 2. 需登录：用户设置、文档、工作日志、资料、社区、搜索、AI 助手
/// 3. 需管理员：`/admin/*`、`/party-info/admin`
///
/// # 中间件
/// - 需登录的分组：黑名单检查
/// - 管理员分组：黑名单检查 → 管理员守卫（从外到内）
/// - 上传接口关闭默认请求体上限，大小由上传逻辑按角色控制
/// - 全局：请求日志与 CORS
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout));

    let user_routes = Router::new()
        .route("/me", get(handlers::users::get_me).patch(handlers::users::update_me))
        .route(
            "/me/api-key",
            get(handlers::users::get_api_key)
                .post(handlers::users::save_api_key)
                .patch(handlers::users::set_api_key_preference)
                .delete(handlers::users::clear_api_key),
        );

    let document_routes = Router::new()
        .route("/", get(handlers::documents::list).post(handlers::documents::create))
        .route(
            "/{id}",
            get(handlers::documents::get)
                .patch(handlers::documents::update)
                .delete(handlers::documents::delete),
        )
        .route(
            "/{id}/attachments",
            get(handlers::documents::list_attachments)
                .post(handlers::documents::upload_attachment)
                .layer(DefaultBodyLimit::disable()),
        );

    let work_log_routes = Router::new()
        .route("/", get(handlers::work_logs::list).post(handlers::work_logs::create))
        .route(
            "/{id}",
            get(handlers::work_logs::get)
                .patch(handlers::work_logs::update)
                .delete(handlers::work_logs::delete),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(handlers::materials::list_categories).post(handlers::materials::create_category),
        )
        .route("/{id}", delete(handlers::materials::delete_category))
        .route("/{id}/materials", get(handlers::materials::category_materials))
        .route(
            "/{id}/upload",
            post(handlers::materials::upload).layer(DefaultBodyLimit::disable()),
        );

    let material_routes = Router::new()
        .route("/", get(handlers::materials::list_materials))
        .route("/{id}", delete(handlers::materials::delete_material))
        .route("/{id}/download", get(handlers::materials::download));

    let file_routes = Router::new()
        .route("/", post(handlers::files::upload).layer(DefaultBodyLimit::disable()))
        .route("/{id}", delete(handlers::files::delete));

    let party_info_routes = Router::new()
        .route(
            "/",
            get(handlers::party_info::get_own).post(handlers::party_info::upsert),
        )
        .route("/search", get(handlers::party_info::search));

    let community_routes = Router::new()
        .route(
            "/topics",
            get(handlers::community::list_topics).post(handlers::community::create_topic),
        )
        .route(
            "/topics/{id}",
            get(handlers::community::get_topic).delete(handlers::community::delete_topic),
        )
        .route("/topics/{id}/answers", post(handlers::community::create_answer))
        .route("/answers/{id}", delete(handlers::community::delete_answer))
        .route(
            "/answers/{id}/like",
            get(handlers::community::like_state).post(handlers::community::toggle_like),
        )
        .route(
            "/answers/{id}/replies",
            get(handlers::community::list_replies).post(handlers::community::create_reply),
        );

    // 需登录的分组共用一层黑名单检查
    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/documents", document_routes)
        .nest("/worklogs", work_log_routes)
        .nest("/categories", category_routes)
        .nest("/materials", material_routes)
        .nest("/upload", file_routes)
        .nest("/party-info", party_info_routes)
        .merge(community_routes)
        .route("/search", get(handlers::search::search))
        .route("/chat", post(handlers::chat::chat))
        .route("/pdf/optimize", post(handlers::chat::optimize_pdf))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth::auth_middleware,
        ));

    // 执行顺序从下往上：先黑名单，再管理员守卫
    let admin_routes = Router::new()
        .route("/admin/users/{id}/promote", post(handlers::users::promote))
        .route("/party-info/admin", get(handlers::party_info::admin_list))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth::admin_guard,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth::auth_middleware,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/party-info/public", get(handlers::party_info::get_public))
        .merge(protected_routes)
        .merge(admin_routes);

    Router::new()
        .route("/", get(|| async { "🚀 Branch portal is running!" }))
        .nest("/api", api_routes)
        .nest_service(UPLOAD_URL_PREFIX, ServeDir::new(&state.config.upload_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
