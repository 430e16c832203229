use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::sqlite::SqliteDatabase;
use super::traits::Database;

/// 数据库类型
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Sqlite,
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type", default)]
    pub db_type: DatabaseType,

    /// SQLite配置
    pub sqlite: Option<SqliteConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            sqlite: Some(SqliteConfig::default()),
        }
    }
}

/// SQLite配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/keyword-bot.db".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

/// 按配置创建数据库并初始化表结构
pub async fn create_database(config: &DatabaseConfig) -> Result<Arc<dyn Database>> {
    match config.db_type {
        DatabaseType::Sqlite => {
            let sqlite_config = config
                .sqlite
                .as_ref()
                .ok_or_else(|| anyhow!("SQLite数据库配置缺失"))?;

            info!(event = "db.init.start", path = %sqlite_config.path, "连接SQLite数据库");
            let db = SqliteDatabase::new(&sqlite_config.path, sqlite_config.max_connections).await?;
            db.initialize().await?;
            info!(event = "db.init.complete", "SQLite数据库连接和初始化成功");
            Ok(Arc::new(db))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_sqlite_database() {
        let config = DatabaseConfig {
            db_type: DatabaseType::Sqlite,
            sqlite: Some(SqliteConfig {
                path: ":memory:".to_string(),
                max_connections: 1,
            }),
        };

        let db = create_database(&config).await.unwrap();
        assert!(db.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_sqlite_section_is_error() {
        let config = DatabaseConfig {
            db_type: DatabaseType::Sqlite,
            sqlite: None,
        };
        assert!(create_database(&config).await.is_err());
    }
}
