//! 配置结构定义模块
//! 包含系统配置的所有数据结构

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::db::DatabaseConfig;
use crate::util::rules::{DEFAULT_FUZZY_MAX_CELLS, DEFAULT_FUZZY_THRESHOLD, DEFAULT_REGEX_SIZE_LIMIT};

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 规则引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// 群组规则快照的存活时间
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// 同一群组同一规则两次回复的最小间隔
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// 过期冷却记录的清理周期，0 表示不清理
    #[serde(default = "default_prune_interval_secs")]
    pub throttle_prune_interval_secs: u64,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,
    /// 单条正则编译后的程序大小上限（字节）
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,
    /// 单条模糊规则的对齐计算上限
    #[serde(default = "default_fuzzy_max_cells")]
    pub fuzzy_max_cells: u64,
}

impl RulesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn prune_interval(&self) -> Option<Duration> {
        (self.throttle_prune_interval_secs > 0)
            .then(|| Duration::from_secs(self.throttle_prune_interval_secs))
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cooldown_secs: default_cooldown_secs(),
            throttle_prune_interval_secs: default_prune_interval_secs(),
            fuzzy_threshold: default_fuzzy_threshold(),
            regex_size_limit: default_regex_size_limit(),
            fuzzy_max_cells: default_fuzzy_max_cells(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: LogFileConfig,
    pub structured: Option<bool>, // 是否输出JSON结构化日志
    #[serde(default)]
    pub level_config: Option<LevelConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: LogFileConfig::default(),
            structured: Some(false),
            level_config: None,
        }
    }
}

/// 日志文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub directory: String,
    pub retention_days: Option<u32>,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "logs".to_string(),
            retention_days: Some(7),
        }
    }
}

/// 分模块日志级别
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelConfig {
    /// 规则引擎（缓存、匹配、限流、回复）
    #[serde(default)]
    pub rules: Option<String>,
    /// 存储层
    #[serde(default)]
    pub db: Option<String>,
    /// 启动与控制台传输
    #[serde(default)]
    pub server: Option<String>,
    /// 任意 target => level
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    8
}

fn default_prune_interval_secs() -> u64 {
    300
}

fn default_fuzzy_threshold() -> u8 {
    DEFAULT_FUZZY_THRESHOLD
}

fn default_regex_size_limit() -> usize {
    DEFAULT_REGEX_SIZE_LIMIT
}

fn default_fuzzy_max_cells() -> u64 {
    DEFAULT_FUZZY_MAX_CELLS
}

fn default_log_level() -> String {
    "info".to_string()
}
