use crate::util::config::{LevelConfig, LoggingConfig};
use std::io;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::fmt::format::{Format, Full};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::EnvFilter, Layer, Registry};

/// 日志文件名前缀，同时用于清理时识别日志文件
pub const LOG_FILE_PREFIX: &str = "keyword-bot";

/// 按配置初始化日志
///
/// 控制台输出写到 stderr，stdout 留给控制台传输的回复事件。
/// 返回的 `WorkerGuard` 必须在进程生命周期内持有，否则文件日志会丢失。
pub fn log_init_with_config(
    file_prefix: &str,
    config: &LoggingConfig,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level_filter = parse_level_filter(&config.level);
    let filter_expression = build_env_filter_expression(level_filter, config.level_config.as_ref());
    let use_json = config.structured.unwrap_or(false);

    let console_filter = EnvFilter::try_new(filter_expression.as_str())
        .unwrap_or_else(|_| EnvFilter::new(level_filter_to_str(level_filter)));

    if !config.file.enabled {
        if use_json {
            let console_layer = layer()
                .json()
                .with_target(false)
                .with_writer(io::stderr)
                .with_filter(console_filter);
            Registry::default().with(console_layer).try_init()?;
        } else {
            let console_layer = layer()
                .event_format(console_format())
                .with_writer(io::stderr)
                .with_filter(console_filter);
            Registry::default().with(console_layer).try_init()?;
        }

        tracing::info!(event = "log.init", level = %config.level, console = true, file = false, structured = use_json);
        return Ok(None);
    }

    let log_dir = resolve_log_dir(&config.file.directory);
    std::fs::create_dir_all(&log_dir)?;

    let file_filter = EnvFilter::try_new(filter_expression.as_str())
        .unwrap_or_else(|_| EnvFilter::new(level_filter_to_str(level_filter)));
    let file_appender = daily(&log_dir, format!("{}.log", file_prefix));
    let (no_blocking, guard) = tracing_appender::non_blocking(file_appender);

    if use_json {
        let console_layer = layer()
            .json()
            .with_target(false)
            .with_writer(io::stderr)
            .with_filter(console_filter);
        let file_layer = layer()
            .json()
            .with_target(false)
            .with_ansi(false)
            .with_writer(no_blocking)
            .with_filter(file_filter);
        Registry::default()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        let console_layer = layer()
            .event_format(console_format())
            .with_writer(io::stderr)
            .with_filter(console_filter);
        let file_layer = layer()
            .event_format(Format::default().with_target(false))
            .with_ansi(false)
            .with_writer(no_blocking)
            .with_filter(file_filter);
        Registry::default()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    }

    tracing::info!(
        event = "log.init",
        level = %config.level,
        console = true,
        file = true,
        directory = %log_dir.display(),
        rotation = "daily",
        structured = use_json
    );

    if let Some(retention) = config.file.retention_days.filter(|days| *days > 0) {
        tracing::info!(event = "log.retention", days = retention);
        if let Err(e) = cleanup_old_logs(&log_dir, retention) {
            tracing::warn!(event = "log.retention", error = %e, "清理过期日志失败");
        }
    }

    Ok(Some(guard))
}

fn console_format() -> Format<Full, ()> {
    Format::default()
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
}

/// 相对路径以工作目录为基准；在 bin 目录下运行时取上级目录
fn resolve_log_dir(directory: &str) -> PathBuf {
    let path = Path::new(directory);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
        if let Some(parent) = current_dir.parent() {
            return parent.join(directory);
        }
    }
    current_dir.join(directory)
}

/// 删除超过保留天数的日志文件，返回删除数量
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u32) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        tracing::debug!("日志目录不存在: {}", log_dir.display());
        return Ok(0);
    }

    let cutoff_time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs()
        .saturating_sub(retention_days as u64 * 24 * 60 * 60);

    let mut deleted_count = 0;
    let mut error_count = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("");

        // 只处理本服务的日志文件
        if !file_name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let check_time = metadata
            .modified()
            .or_else(|_| metadata.created())
            .unwrap_or_else(|_| std::time::SystemTime::now());

        if let Ok(file_time) = check_time.duration_since(std::time::UNIX_EPOCH) {
            if file_time.as_secs() < cutoff_time {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        deleted_count += 1;
                        tracing::debug!("已删除过期日志: {}", path.display());
                    }
                    Err(e) => {
                        error_count += 1;
                        tracing::warn!("删除日志文件失败: {} - {}", path.display(), e);
                    }
                }
            }
        }
    }

    if deleted_count > 0 {
        tracing::info!("已清理 {} 个过期日志文件", deleted_count);
    }
    if error_count > 0 {
        tracing::warn!("有 {} 个文件清理失败", error_count);
    }

    Ok(deleted_count)
}

fn parse_level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn build_env_filter_expression(
    default_level: LevelFilter,
    level_config: Option<&LevelConfig>,
) -> String {
    let mut directives = vec![level_filter_to_str(default_level).to_string()];

    if let Some(cfg) = level_config {
        if let Some(level) = cfg.rules.as_deref().and_then(normalize_level_str) {
            directives.push(format!("keyword_bot::util::rules={level}"));
        }
        if let Some(level) = cfg.db.as_deref().and_then(normalize_level_str) {
            directives.push(format!("keyword_bot::db={level}"));
            directives.push(format!("sqlx={level}"));
        }
        if let Some(level) = cfg.server.as_deref().and_then(normalize_level_str) {
            directives.push(format!("keyword_bot::server={level}"));
        }

        let mut overrides: Vec<_> = cfg.overrides.iter().collect();
        overrides.sort();
        for (target, level_str) in overrides {
            if let Some(level) = normalize_level_str(level_str) {
                directives.push(format!("{}={level}", normalize_directive_target(target)));
            }
        }
    }

    directives.join(",")
}

fn normalize_level_str(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

fn level_filter_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::OFF => "off",
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "info",
        LevelFilter::DEBUG => "debug",
        LevelFilter::TRACE => "trace",
    }
}

fn normalize_directive_target(target: &str) -> String {
    if let Some(raw) = target.strip_prefix("target:") {
        raw.to_string()
    } else if target.contains("::") {
        target.to_string()
    } else {
        let path = target.replace('.', "::");
        format!("keyword_bot::{path}")
    }
}
