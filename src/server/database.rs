//! 数据库初始化模块

use crate::db::{self, Database};
use crate::util::config::Config;
use crate::util::logging::standards::events;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// 数据库初始化器
pub struct DatabaseInitializer;

impl DatabaseInitializer {
    /// 按配置创建数据库并建表
    pub async fn create_from_config(config: &Config) -> Result<Arc<dyn Database>> {
        let database = db::create_database(&config.database).await?;
        info!(event = events::DB_INIT, db_type = ?config.database.db_type, "数据库就绪");
        Ok(database)
    }

    /// 执行数据库健康检查
    pub async fn health_check(database: &Arc<dyn Database>) -> DatabaseHealth {
        let start_time = Instant::now();
        let result = database.health_check().await;
        let response_time_ms = start_time.elapsed().as_millis() as u64;

        let health = match result {
            Ok(true) => DatabaseHealth::healthy(response_time_ms),
            Ok(false) => DatabaseHealth::unhealthy("健康检查查询未返回预期结果".to_string()),
            Err(e) => DatabaseHealth::unhealthy(e.to_string()),
        };

        if health.is_healthy {
            info!(event = events::DB_HEALTH, healthy = true, response_time_ms);
        } else {
            warn!(
                event = events::DB_HEALTH,
                healthy = false,
                error = health.error_message.as_deref().unwrap_or("")
            );
        }
        health
    }
}

/// 数据库健康状态
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub is_healthy: bool,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub last_check: chrono::DateTime<chrono::Utc>,
}

impl DatabaseHealth {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            is_healthy: true,
            response_time_ms,
            error_message: None,
            last_check: chrono::Utc::now(),
        }
    }

    pub fn unhealthy(error: String) -> Self {
        Self {
            is_healthy: false,
            response_time_ms: 0,
            error_message: Some(error),
            last_check: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteConfig;

    #[tokio::test]
    async fn test_health_check_on_memory_database() {
        let mut config = Config::default();
        config.database.sqlite = Some(SqliteConfig {
            path: ":memory:".to_string(),
            max_connections: 1,
        });

        let database = DatabaseInitializer::create_from_config(&config).await.unwrap();
        let health = DatabaseInitializer::health_check(&database).await;
        assert!(health.is_healthy);
        assert!(health.error_message.is_none());
    }
}
