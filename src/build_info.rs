/// Build-time metadata exposed at runtime.
pub const BUILD_VERSION: &str = env!("BOT_BUILD_VERSION");
pub const BUILD_COMMIT: &str = env!("BOT_BUILD_COMMIT");
pub const BUILD_TIMESTAMP: &str = env!("BOT_BUILD_TIMESTAMP");

/// Cargo 版本与构建信息的可读摘要，启动日志中使用
pub fn summary() -> String {
    format!(
        "keyword-bot {} (build {}, commit {}, built at {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_VERSION,
        BUILD_COMMIT,
        BUILD_TIMESTAMP
    )
}
