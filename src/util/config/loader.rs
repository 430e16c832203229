//! 配置加载和管理模块
//! 处理配置文件的读取、写入和环境变量覆盖

use super::types::*;
use crate::db::SqliteConfig;
use crate::util::logging::standards::events;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从YAML文件读取配置
    pub fn read_yaml(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = serde_yaml::from_str(&config_str)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 从环境变量读取配置覆盖
    pub fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// 覆盖逻辑与环境变量来源分离，便于测试
    pub fn apply_overrides_from<F>(mut config: Config, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            config
                .database
                .sqlite
                .get_or_insert_with(SqliteConfig::default)
                .path = path.clone();
            tracing::info!(event = events::CONFIG_ENV_OVERRIDE, key = "DATABASE_PATH", value = %path);
        }

        if let Some(ttl) = parse_env::<u64>(&lookup, "RULE_CACHE_TTL_SECONDS") {
            config.rules.cache_ttl_secs = ttl;
            tracing::info!(event = events::CONFIG_ENV_OVERRIDE, key = "RULE_CACHE_TTL_SECONDS", value = ttl);
        }

        if let Some(cooldown) = parse_env::<u64>(&lookup, "RULE_COOLDOWN_SECONDS") {
            config.rules.cooldown_secs = cooldown;
            tracing::info!(event = events::CONFIG_ENV_OVERRIDE, key = "RULE_COOLDOWN_SECONDS", value = cooldown);
        }

        if let Some(level) = lookup("LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            config.logging.level = level.trim().to_ascii_lowercase();
            tracing::info!(event = events::CONFIG_ENV_OVERRIDE, key = "LOG_LEVEL", value = %config.logging.level);
        }

        config
    }

    /// 配置加载（配置文件 + 环境变量）
    pub fn load_with_env_overrides(path: impl AsRef<Path>) -> Result<Config> {
        let base_config = Self::read_yaml(path)?;
        Ok(Self::apply_env_overrides(base_config))
    }
}

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(
                event = events::CONFIG_ENV_OVERRIDE,
                key,
                value = %raw,
                "环境变量无法解析，忽略"
            );
            None
        }
    }
}

/// 配置写入器
pub struct ConfigWriter;

impl ConfigWriter {
    /// 写入配置到指定路径，确保目录存在
    pub fn write_yaml_with_dir(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建配置目录失败: {}", parent.display()))?;
        }

        let yaml_content = serde_yaml::to_string(config)?;
        fs::write(path, yaml_content)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 生成配置模板
    pub fn generate_template() -> Config {
        Config {
            database: Default::default(),
            rules: RulesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
