use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 群组记录（chat_id 即群组主键）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group_id: i64,
    pub title: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 持久化的关键词规则
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleRecord {
    pub id: i64,
    pub group_id: i64,
    /// exact / contains / regex / fuzzy
    pub match_type: String,
    pub pattern: String,
    pub reply: String,
    pub priority: i32,
    pub enabled: bool,
    /// 回复发出后多少秒撤回，None 表示不撤回
    pub delete_after: Option<u32>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建规则参数
#[derive(Debug, Clone)]
pub struct NewRule {
    pub group_id: i64,
    pub match_type: String,
    pub pattern: String,
    pub reply: String,
    pub priority: i32,
    pub enabled: bool,
    pub delete_after: Option<u32>,
    pub created_by: i64,
}

/// 审计日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub group_id: i64,
    pub actor_user_id: i64,
    pub action: String,
    pub before_json: Option<String>,
    pub after_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的审计日志
#[derive(Debug, Clone)]
pub struct NewAudit {
    pub group_id: i64,
    pub actor_user_id: i64,
    pub action: String,
    pub before_json: Option<String>,
    pub after_json: Option<String>,
}

/// 数据库操作trait
#[async_trait]
pub trait Database: Send + Sync {
    /// 确保群组存在，标题变化时顺带刷新
    async fn ensure_group(&self, group_id: i64, title: Option<&str>) -> Result<GroupRecord>;

    /// 列出群组启用的规则，按 (priority, id) 升序
    async fn list_enabled_rules(&self, group_id: i64) -> Result<Vec<RuleRecord>>;

    /// 管理端分页列表：启用优先，其次 (priority, id)
    async fn list_rules(&self, group_id: i64, limit: u32, offset: u32) -> Result<Vec<RuleRecord>>;

    async fn get_rule(&self, group_id: i64, rule_id: i64) -> Result<Option<RuleRecord>>;

    async fn create_rule(&self, rule: &NewRule) -> Result<RuleRecord>;

    /// 覆盖更新 pattern/reply/priority/enabled/delete_after
    async fn update_rule(&self, rule: &RuleRecord) -> Result<()>;

    /// 删除规则，返回是否确有删除
    async fn delete_rule(&self, group_id: i64, rule_id: i64) -> Result<bool>;

    async fn add_audit(&self, entry: &NewAudit) -> Result<()>;

    async fn list_audit(&self, group_id: i64, limit: u32) -> Result<Vec<AuditRecord>>;

    /// 健康检查
    async fn health_check(&self) -> Result<bool>;

    /// 初始化表结构
    async fn initialize(&self) -> Result<()>;
}
