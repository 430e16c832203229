//! 配置管理模块
//! 负责配置文件的查找、加载、验证和日志初始化

use crate::util::config::loader::ConfigLoader;
use crate::util::config::{Config, ConfigValidator, ValidationReport};
use crate::util::log::{log_init_with_config, LOG_FILE_PREFIX};
use crate::util::logging::standards::events;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 加载和验证配置；存在错误时返回 Err
    pub fn load_and_validate() -> Result<(Config, ValidationReport)> {
        let config_path = Self::find_config_file_path(CONFIG_FILE_NAME);
        Self::load_and_validate_from(&config_path)
    }

    pub fn load_and_validate_from(config_path: &Path) -> Result<(Config, ValidationReport)> {
        let mut template_result = None;
        let config = if config_path.exists() {
            ConfigLoader::load_with_env_overrides(config_path)?
        } else {
            template_result = Some(Config::default().write_yaml_to_path(config_path));
            ConfigLoader::apply_env_overrides(Config::default())
        };

        let mut report = ConfigValidator::validate_all(&config);
        match template_result {
            Some(Ok(())) => report.add_info(
                "config",
                &format!("已创建默认配置文件: {}", config_path.display()),
            ),
            Some(Err(e)) => report.add_warning(
                "config",
                &format!("创建默认配置文件失败: {} - {}", config_path.display(), e),
            ),
            None => {}
        }
        if report.has_errors() {
            let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
            return Err(anyhow!(
                "配置验证失败: {} 个错误 ({})",
                report.errors.len(),
                details.join("; ")
            ));
        }

        Ok((config, report))
    }

    /// 初始化日志系统，并补记日志就绪前的配置结果
    pub fn initialize_logging(
        config: &Config,
        config_path: &Path,
        report: &ValidationReport,
    ) -> Result<Option<WorkerGuard>> {
        let guard = log_init_with_config(LOG_FILE_PREFIX, &config.logging)?;

        info!(event = events::CONFIG_LOADED, path = %config_path.display());
        for warning in &report.warnings {
            warn!(
                event = events::CONFIG_VALIDATION_WARNING,
                field = %warning.field,
                "{}",
                warning.message
            );
        }
        for item in &report.info {
            info!(event = events::CONFIG_TEMPLATE_WRITTEN, field = %item.field, "{}", item.message);
        }

        Ok(guard)
    }

    /// 查找配置文件路径，适应开发和生产环境
    pub fn find_config_file_path(filename: &str) -> PathBuf {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        // 当前目录下的 config/
        let config_in_current = current_dir.join("config").join(filename);
        if config_in_current.exists() {
            return config_in_current;
        }

        // 在 bin/ 目录运行时，上级目录的 config/
        if let Some(parent) = current_dir.parent() {
            let config_in_parent = parent.join("config").join(filename);
            if config_in_parent.exists() {
                return config_in_parent;
            }
        }

        // 可执行文件位于 bin/ 时，项目根目录的 config/
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            if exe_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
                if let Some(project_root) = exe_dir.parent() {
                    let config_in_root = project_root.join("config").join(filename);
                    if config_in_root.exists() {
                        return config_in_root;
                    }
                }
            }
        }

        let dev_path = current_dir.join(filename);
        if dev_path.exists() {
            return dev_path;
        }

        current_dir.join("config").join(filename)
    }
}
