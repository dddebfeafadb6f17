use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter,
};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "app.log";

/// 初始化日志：控制台 + 按天滚动的文件。返回的 guard 需要一直持有到进程退出。
pub fn init(log_level: &str) -> WorkerGuard {
    // 1. 文件输出层：按天轮询，存放在 logs 文件夹下
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 2. 文件层不带颜色，保留代码位置，方便排查上传/删除文件的告警
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    // 3. 控制台层
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true);

    // 配置的级别无法解析时退回 info，而不是让进程起不来
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
