// src/start.rs
use std::{net::SocketAddr, time::Duration};

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use secrecy::ExposeSecret;
use tokio::{net::TcpListener, signal};

use crate::{
    core::{config::Config, log},
    routes,
    services::auth::ensure_bootstrap_accounts,
    state::AppState,
};

/// 启动服务。
///
/// 1. 加载配置并初始化日志
/// 2. 连接数据库并执行迁移，同步配置中的初始账号
/// 3. 连接 Redis
/// 4. 准备上传目录，组装应用状态
/// 5. 启动 HTTP 服务，收到退出信号后优雅关闭
///
/// 启动阶段任何一步失败都直接退出进程。
pub async fn run() {
    let config = Config::new();

    // guard 必须活到进程结束，否则文件日志会丢
    let _guard = log::init(&config.rust_log);
    tracing::info!("🔍 Config loaded successfully.");

    let mut opt = ConnectOptions::new(config.database_url.expose_secret());
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("❌ Failed to connect to Database");
    tracing::info!("✅ Database connected.");

    Migrator::up(&db, None)
        .await
        .expect("❌ Failed to run migrations");
    tracing::info!("✅ Migrations applied.");

    ensure_bootstrap_accounts(&db, &config.bootstrap_accounts())
        .await
        .expect("❌ Failed to sync bootstrap accounts");

    let client = redis::Client::open(config.redis_url.expose_secret())
        .expect("❌ Invalid Redis URL");
    let redis_manager = client
        .get_connection_manager()
        .await
        .expect("❌ Failed to connect to Redis");
    tracing::info!("✅ Redis connected.");

    let state = AppState::new(db, redis_manager, config.clone())
        .expect("❌ Failed to build HTTP client");
    state
        .files
        .init()
        .await
        .expect("❌ Failed to create upload directory");

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .expect("❌ Invalid address configuration");

    let listener = TcpListener::bind(addr)
        .await
        .expect("❌ Failed to bind address");
    tracing::info!("🚀 Server listening on http://{}", addr);

    let app = routes::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("❌ Server error");
}

/// 等待 Ctrl+C 或 SIGTERM，任一到达即返回
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Signal received, starting graceful shutdown...");
}
