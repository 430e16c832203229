//! 配置验证模块
//! 提供配置的验证、检查和诊断功能

use super::types::*;
use crate::db::{DatabaseConfig, DatabaseType};

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 全面验证配置
    pub fn validate_all(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_database_config(&config.database, &mut report);
        Self::validate_rules_config(&config.rules, &mut report);
        Self::validate_logging_config(&config.logging, &mut report);

        report
    }

    /// 验证数据库配置
    fn validate_database_config(config: &DatabaseConfig, report: &mut ValidationReport) {
        match config.db_type {
            DatabaseType::Sqlite => match &config.sqlite {
                None => report.add_error("database.sqlite", "SQLite配置缺失"),
                Some(sqlite) => {
                    if sqlite.path.trim().is_empty() {
                        report.add_error("database.sqlite.path", "数据库路径不能为空");
                    }
                    if sqlite.max_connections == 0 {
                        report.add_error("database.sqlite.max_connections", "连接数必须大于0");
                    }
                }
            },
        }
    }

    /// 验证规则引擎配置
    fn validate_rules_config(config: &RulesConfig, report: &mut ValidationReport) {
        if config.fuzzy_threshold > 100 {
            report.add_error(
                "rules.fuzzy_threshold",
                &format!("模糊匹配阈值必须在0-100之间: {}", config.fuzzy_threshold),
            );
        }

        if config.cache_ttl_secs == 0 {
            report.add_warning("rules.cache_ttl_secs", "缓存TTL为0，每条消息都会读库");
        }

        if config.cooldown_secs == 0 {
            report.add_warning("rules.cooldown_secs", "冷却时间为0，规则不限流");
        }

        if config.throttle_prune_interval_secs == 0 {
            report.add_info("rules.throttle_prune_interval_secs", "冷却记录清理已关闭");
        }

        if config.regex_size_limit < 1024 {
            report.add_warning(
                "rules.regex_size_limit",
                "正则大小上限过小，将按1024字节处理",
            );
        }

        if config.fuzzy_max_cells == 0 {
            report.add_error("rules.fuzzy_max_cells", "模糊匹配计算上限必须大于0");
        }
    }

    /// 验证日志配置
    fn validate_logging_config(config: &LoggingConfig, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.level.as_str()) {
            report.add_error("logging.level", &format!("无效的日志级别: {}", config.level));
        }

        if let Some(level_config) = &config.level_config {
            let named = [
                ("logging.level_config.rules", &level_config.rules),
                ("logging.level_config.db", &level_config.db),
                ("logging.level_config.server", &level_config.server),
            ];
            for (field, level) in named {
                if let Some(level) = level {
                    if !valid_levels.contains(&level.as_str()) {
                        report.add_warning(field, &format!("无效的日志级别，将忽略: {}", level));
                    }
                }
            }
        }

        if config.file.enabled {
            if config.file.directory.trim().is_empty() {
                report.add_error("logging.file.directory", "日志目录不能为空");
            }
            if config.file.retention_days == Some(0) {
                report.add_warning("logging.file.retention_days", "日志保留天数为0，日志将不会被清理");
            }
        }
    }
}

/// 验证报告
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    pub fn add_info(&mut self, field: &str, message: &str) {
        self.info.push(ValidationIssue::new(field, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// 验证问题
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::ConfigWriter;

    #[test]
    fn test_template_is_valid() {
        let report = ConfigValidator::validate_all(&ConfigWriter::generate_template());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_detects_errors_and_warnings() {
        let mut config = ConfigWriter::generate_template();
        config.rules.fuzzy_threshold = 120;
        config.rules.cooldown_secs = 0;
        config.logging.level = "verbose".to_string();
        config.database.sqlite = None;

        let report = ConfigValidator::validate_all(&config);
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"rules.fuzzy_threshold"));
        assert!(fields.contains(&"logging.level"));
        assert!(fields.contains(&"database.sqlite"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.field == "rules.cooldown_secs"));
    }
}
