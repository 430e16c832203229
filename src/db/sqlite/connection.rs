//! SQLite连接管理
//! 处理数据库连接池的创建和管理

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// 内存数据库标识，仅测试与临时运行使用
pub const MEMORY_PATH: &str = ":memory:";

/// SQLite连接管理器
pub struct ConnectionManager;

impl ConnectionManager {
    /// 创建新的SQLite连接池
    pub async fn create_pool(db_path: &str, max_connections: u32) -> Result<SqlitePool> {
        if db_path == MEMORY_PATH {
            // 每条内存连接都是独立的库，只能保留一条
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await
                .context("打开内存数据库失败")?;
            info!(event = "db.connect", path = MEMORY_PATH);
            return Ok(pool);
        }

        // 确保数据库目录存在
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("创建数据库目录失败: {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("连接SQLite数据库失败: {}", db_path))?;

        info!(event = "db.connect", path = db_path, "已连接SQLite数据库");
        Ok(pool)
    }
}
