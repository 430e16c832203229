use std::sync::Arc;

use anyhow::{Context, Result};

use crate::db::traits::{Database, RuleRecord};

/// 规则仓储 - 负责缓存未命中时从数据库加载
pub struct RuleRepository {
    db: Arc<dyn Database>,
}

impl RuleRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// 确保群组存在后读取启用规则，顺序 (priority, id)
    pub async fn load_enabled(&self, chat_id: i64, title: Option<&str>) -> Result<Vec<RuleRecord>> {
        self.db
            .ensure_group(chat_id, title)
            .await
            .with_context(|| format!("登记群组 {} 失败", chat_id))?;

        self.db
            .list_enabled_rules(chat_id)
            .await
            .with_context(|| format!("读取群组 {} 的规则失败", chat_id))
    }
}
