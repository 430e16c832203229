//! SQLite模块
//! 规则、群组与审计日志的SQLite实现

pub mod connection;
pub mod queries;
pub mod schemas;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::traits::*;
use connection::ConnectionManager;
use queries::{AuditQueries, GroupQueries, HealthQueries, RuleQueries};
use schemas::SchemaManager;

/// SQLite数据库实现
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// 创建新的SQLite数据库实例
    pub async fn new(db_path: &str, max_connections: u32) -> Result<Self> {
        let pool = ConnectionManager::create_pool(db_path, max_connections).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn ensure_group(&self, group_id: i64, title: Option<&str>) -> Result<GroupRecord> {
        GroupQueries::ensure(&self.pool, group_id, title).await
    }

    async fn list_enabled_rules(&self, group_id: i64) -> Result<Vec<RuleRecord>> {
        RuleQueries::list_enabled(&self.pool, group_id).await
    }

    async fn list_rules(&self, group_id: i64, limit: u32, offset: u32) -> Result<Vec<RuleRecord>> {
        RuleQueries::list(&self.pool, group_id, limit, offset).await
    }

    async fn get_rule(&self, group_id: i64, rule_id: i64) -> Result<Option<RuleRecord>> {
        RuleQueries::get(&self.pool, group_id, rule_id).await
    }

    async fn create_rule(&self, rule: &NewRule) -> Result<RuleRecord> {
        RuleQueries::insert(&self.pool, rule).await
    }

    async fn update_rule(&self, rule: &RuleRecord) -> Result<()> {
        RuleQueries::update(&self.pool, rule).await
    }

    async fn delete_rule(&self, group_id: i64, rule_id: i64) -> Result<bool> {
        RuleQueries::delete(&self.pool, group_id, rule_id).await
    }

    async fn add_audit(&self, entry: &NewAudit) -> Result<()> {
        AuditQueries::insert(&self.pool, entry).await
    }

    async fn list_audit(&self, group_id: i64, limit: u32) -> Result<Vec<AuditRecord>> {
        AuditQueries::list(&self.pool, group_id, limit).await
    }

    async fn health_check(&self) -> Result<bool> {
        HealthQueries::check_health(&self.pool).await
    }

    async fn initialize(&self) -> Result<()> {
        SchemaManager::create_all_tables(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_rule(group_id: i64, match_type: &str, pattern: &str, priority: i32) -> NewRule {
        NewRule {
            group_id,
            match_type: match_type.to_string(),
            pattern: pattern.to_string(),
            reply: format!("reply to {}", pattern),
            priority,
            enabled: true,
            delete_after: None,
            created_by: 42,
        }
    }

    async fn open(dir: &TempDir) -> SqliteDatabase {
        let path = dir.path().join("bot.db");
        let db = SqliteDatabase::new(path.to_str().unwrap(), 2).await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_enabled_rules_are_ordered_by_priority_then_id() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        db.ensure_group(-100, Some("群聊")).await.unwrap();

        let late = db.create_rule(&new_rule(-100, "exact", "b", 20)).await.unwrap();
        let first = db.create_rule(&new_rule(-100, "exact", "a", 10)).await.unwrap();
        let tie = db.create_rule(&new_rule(-100, "contains", "c", 10)).await.unwrap();

        let mut disabled = db.create_rule(&new_rule(-100, "exact", "d", 1)).await.unwrap();
        disabled.enabled = false;
        db.update_rule(&disabled).await.unwrap();

        // 其他群的规则不应出现
        db.ensure_group(-200, None).await.unwrap();
        db.create_rule(&new_rule(-200, "exact", "x", 0)).await.unwrap();

        let ids: Vec<i64> = db
            .list_enabled_rules(-100)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![first.id, tie.id, late.id]);

        // 管理列表：启用优先，禁用的排在最后
        let all = db.list_rules(-100, 30, 0).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all.last().unwrap().id, disabled.id);
    }

    #[tokio::test]
    async fn test_ensure_group_keeps_title_when_missing() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;

        let group = db.ensure_group(-1, Some("first")).await.unwrap();
        assert_eq!(group.title.as_deref(), Some("first"));
        assert!(group.enabled);

        let group = db.ensure_group(-1, None).await.unwrap();
        assert_eq!(group.title.as_deref(), Some("first"));

        let group = db.ensure_group(-1, Some("renamed")).await.unwrap();
        assert_eq!(group.title.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn test_update_and_delete_rule() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        db.ensure_group(-1, None).await.unwrap();

        let mut rule = db.create_rule(&new_rule(-1, "regex", "^hi$", 100)).await.unwrap();
        rule.pattern = "^hello$".to_string();
        rule.delete_after = Some(30);
        db.update_rule(&rule).await.unwrap();

        let stored = db.get_rule(-1, rule.id).await.unwrap().unwrap();
        assert_eq!(stored.pattern, "^hello$");
        assert_eq!(stored.delete_after, Some(30));
        assert_eq!(stored.match_type, "regex");

        // 跨群不可删除
        assert!(!db.delete_rule(-2, rule.id).await.unwrap());
        assert!(db.delete_rule(-1, rule.id).await.unwrap());
        assert!(db.get_rule(-1, rule.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_audit_log_newest_first() {
        let db = SqliteDatabase::new(connection::MEMORY_PATH, 1).await.unwrap();
        db.initialize().await.unwrap();
        assert!(db.health_check().await.unwrap());

        for action in ["create", "update_pattern"] {
            db.add_audit(&NewAudit {
                group_id: -1,
                actor_user_id: 7,
                action: action.to_string(),
                before_json: None,
                after_json: Some("{}".to_string()),
            })
            .await
            .unwrap();
        }

        let entries = db.list_audit(-1, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "update_pattern");
        assert_eq!(entries[1].actor_user_id, 7);
    }
}
