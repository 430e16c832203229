//! 服务模块
//!
//! - 配置管理 (config.rs)
//! - 数据库初始化 (database.rs)
//! - 控制台传输 (console.rs)

pub mod config;
pub mod console;
pub mod database;

pub use config::ConfigManager;
pub use console::{ConsoleReplySink, ConsoleTransport, LineWriter};
pub use database::{DatabaseHealth, DatabaseInitializer};

use crate::build_info;
use crate::util::config::{Config, ValidationReport};
use crate::util::logging::standards::events;
use crate::util::rules::Throttle;
use crate::AppState;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// 引导程序：配置与日志就绪后的统一入口
pub struct BotBootstrap {
    config: Config,
    validation_report: ValidationReport,
    _log_guard: Option<WorkerGuard>,
}

impl BotBootstrap {
    pub fn new() -> Result<Self> {
        let config_path = ConfigManager::find_config_file_path(config::CONFIG_FILE_NAME);
        Self::from_path(config_path)
    }

    pub fn from_path(config_path: PathBuf) -> Result<Self> {
        let (config, validation_report) = ConfigManager::load_and_validate_from(&config_path)?;
        let log_guard = ConfigManager::initialize_logging(&config, &config_path, &validation_report)?;

        info!(event = events::BOOTSTRAP_START, version = %build_info::summary());

        Ok(Self {
            config,
            validation_report,
            _log_guard: log_guard,
        })
    }

    /// 运行控制台事件循环直到 stdin 结束或收到 Ctrl-C
    pub async fn run(self) -> Result<()> {
        let database = DatabaseInitializer::create_from_config(&self.config).await?;

        let out = Arc::new(LineWriter::new(tokio::io::stdout()));
        let sink = Arc::new(ConsoleReplySink::new(out.clone()));
        let state = AppState::new(self.config.clone(), database, sink);

        let pruner = self
            .config
            .rules
            .prune_interval()
            .map(|interval| spawn_throttle_pruner(state.throttle.clone(), interval));

        info!(
            event = events::BOOTSTRAP_READY,
            cache_ttl_secs = self.config.rules.cache_ttl_secs,
            cooldown_secs = self.config.rules.cooldown_secs,
            fuzzy_threshold = self.config.rules.fuzzy_threshold,
            "规则引擎就绪，开始读取输入"
        );

        let transport = Arc::new(ConsoleTransport::new(state, out));
        let reader = BufReader::new(tokio::io::stdin());

        let result = tokio::select! {
            result = transport.run(reader) => result,
            _ = tokio::signal::ctrl_c() => {
                info!(event = events::BOOTSTRAP_SHUTDOWN, "收到中断信号");
                Ok(())
            }
        };

        if let Some(handle) = pruner {
            handle.abort();
        }
        info!(event = events::BOOTSTRAP_SHUTDOWN, "服务已退出");
        result
    }

    /// 建表后退出
    pub async fn init_db(self) -> Result<()> {
        let database = DatabaseInitializer::create_from_config(&self.config).await?;
        let health = DatabaseInitializer::health_check(&database).await;
        if !health.is_healthy {
            anyhow::bail!(
                "数据库初始化后健康检查失败: {}",
                health.error_message.unwrap_or_default()
            );
        }
        info!(event = events::DB_INIT, "数据库表结构已就绪");
        Ok(())
    }

    pub async fn health_check(self) -> Result<SystemHealthReport> {
        let database_health = match DatabaseInitializer::create_from_config(&self.config).await {
            Ok(database) => DatabaseInitializer::health_check(&database).await,
            Err(e) => DatabaseHealth::unhealthy(format!("{:#}", e)),
        };

        Ok(SystemHealthReport {
            overall_healthy: database_health.is_healthy,
            database_health,
            config_valid: self.validation_report.is_valid(),
            validation_warnings: self
                .validation_report
                .warnings
                .iter()
                .map(|w| w.to_string())
                .collect(),
            version: build_info::summary(),
            check_time: chrono::Utc::now(),
        })
    }
}

/// 定期清理已过冷却期的限流记录
pub fn spawn_throttle_pruner(throttle: Arc<Throttle>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = throttle.prune();
            if removed > 0 {
                debug!(
                    event = events::THROTTLE_PRUNED,
                    removed,
                    remaining = throttle.len()
                );
            }
        }
    })
}

/// 健康检查报告
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthReport {
    pub overall_healthy: bool,
    pub database_health: DatabaseHealth,
    pub config_valid: bool,
    pub validation_warnings: Vec<String>,
    pub version: String,
    pub check_time: chrono::DateTime<chrono::Utc>,
}

/// 启动服务
pub async fn start_bot() -> Result<()> {
    BotBootstrap::new()?.run().await
}

/// 初始化数据库
pub async fn init_database() -> Result<()> {
    BotBootstrap::new()?.init_db().await
}

/// 执行健康检查
pub async fn check_system_health() -> Result<SystemHealthReport> {
    let report = BotBootstrap::new()?.health_check().await?;
    if !report.overall_healthy {
        warn!(event = events::DB_HEALTH, "健康检查未通过");
    }
    Ok(report)
}
