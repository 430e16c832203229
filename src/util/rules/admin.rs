use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::db::traits::{AuditRecord, Database, NewAudit, NewRule, RuleRecord};
use crate::util::logging::standards::events;

use super::cache::RuleCache;
use super::compiler::RuleCompiler;
use super::model::MatchKind;

/// 新建规则的默认优先级
pub const DEFAULT_PRIORITY: i32 = 100;

/// 新建规则请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub chat_id: i64,
    pub actor_id: i64,
    pub match_kind: MatchKind,
    pub pattern: String,
    pub reply: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub delete_after: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
}

/// 管理操作结果；正则无效时规则照常保存，但附带告警提示管理员
#[derive(Debug, Clone)]
pub struct AdminOutcome {
    pub rule: RuleRecord,
    pub regex_warning: Option<String>,
}

/// 规则管理：写库、记审计、使缓存失效
///
/// 权限校验由调用方负责。存储写入成功后立即调用 `RuleCache::invalidate`，
/// 之后才写审计，审计失败时缓存也不会保留旧快照。
pub struct RuleAdmin {
    db: Arc<dyn Database>,
    cache: Arc<RuleCache>,
    compiler: RuleCompiler,
}

impl RuleAdmin {
    pub fn new(db: Arc<dyn Database>, cache: Arc<RuleCache>, compiler: RuleCompiler) -> Self {
        Self { db, cache, compiler }
    }

    pub async fn create_rule(&self, request: CreateRuleRequest) -> Result<AdminOutcome> {
        let pattern = non_empty(&request.pattern, "关键词")?;
        let reply = non_empty(&request.reply, "回复内容")?;

        self.db
            .ensure_group(request.chat_id, request.title.as_deref())
            .await?;

        let rule = self
            .db
            .create_rule(&NewRule {
                group_id: request.chat_id,
                match_type: request.match_kind.as_str().to_string(),
                pattern,
                reply,
                priority: request.priority.unwrap_or(DEFAULT_PRIORITY),
                enabled: true,
                delete_after: request.delete_after.filter(|secs| *secs > 0),
                created_by: request.actor_id,
            })
            .await
            .context("保存规则失败")?;

        self.invalidate(request.chat_id, "create", rule.id);
        self.audit(request.chat_id, request.actor_id, "create", None, Some(&rule))
            .await?;

        Ok(AdminOutcome {
            regex_warning: self.regex_warning(&rule),
            rule,
        })
    }

    pub async fn update_pattern(
        &self,
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        pattern: &str,
    ) -> Result<AdminOutcome> {
        let pattern = non_empty(pattern, "关键词")?;
        self.mutate(chat_id, rule_id, actor_id, "update_pattern", |rule| {
            rule.pattern = pattern
        })
        .await
    }

    pub async fn update_reply(
        &self,
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        reply: &str,
    ) -> Result<AdminOutcome> {
        let reply = non_empty(reply, "回复内容")?;
        self.mutate(chat_id, rule_id, actor_id, "update_reply", |rule| {
            rule.reply = reply
        })
        .await
    }

    /// 0 或 None 表示不自动撤回
    pub async fn set_delete_after(
        &self,
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        seconds: Option<u32>,
    ) -> Result<AdminOutcome> {
        self.mutate(chat_id, rule_id, actor_id, "update_delete_after", |rule| {
            rule.delete_after = seconds.filter(|secs| *secs > 0)
        })
        .await
    }

    pub async fn set_enabled(
        &self,
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        enabled: bool,
    ) -> Result<AdminOutcome> {
        let action = if enabled { "enable" } else { "disable" };
        self.mutate(chat_id, rule_id, actor_id, action, |rule| {
            rule.enabled = enabled
        })
        .await
    }

    pub async fn set_priority(
        &self,
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        priority: i32,
    ) -> Result<AdminOutcome> {
        self.mutate(chat_id, rule_id, actor_id, "update_priority", |rule| {
            rule.priority = priority
        })
        .await
    }

    /// 删除规则；不存在时返回 false
    pub async fn delete_rule(&self, chat_id: i64, rule_id: i64, actor_id: i64) -> Result<bool> {
        let Some(before) = self.db.get_rule(chat_id, rule_id).await? else {
            return Ok(false);
        };

        let deleted = self.db.delete_rule(chat_id, rule_id).await?;
        if deleted {
            self.invalidate(chat_id, "delete", rule_id);
            self.audit(chat_id, actor_id, "delete", Some(&before), None)
                .await?;
        }
        Ok(deleted)
    }

    pub async fn list_rules(&self, chat_id: i64, limit: u32, offset: u32) -> Result<Vec<RuleRecord>> {
        self.db.list_rules(chat_id, limit, offset).await
    }

    pub async fn audit_log(&self, chat_id: i64, limit: u32) -> Result<Vec<AuditRecord>> {
        self.db.list_audit(chat_id, limit).await
    }

    async fn mutate<F>(
        &self,
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        action: &str,
        apply: F,
    ) -> Result<AdminOutcome>
    where
        F: FnOnce(&mut RuleRecord),
    {
        let before = self
            .db
            .get_rule(chat_id, rule_id)
            .await?
            .with_context(|| format!("规则 #{} 不存在", rule_id))?;

        let mut after = before.clone();
        apply(&mut after);
        self.db.update_rule(&after).await?;

        self.invalidate(chat_id, action, rule_id);
        self.audit(chat_id, actor_id, action, Some(&before), Some(&after))
            .await?;

        Ok(AdminOutcome {
            regex_warning: self.regex_warning(&after),
            rule: after,
        })
    }

    async fn audit(
        &self,
        chat_id: i64,
        actor_id: i64,
        action: &str,
        before: Option<&RuleRecord>,
        after: Option<&RuleRecord>,
    ) -> Result<()> {
        self.db
            .add_audit(&NewAudit {
                group_id: chat_id,
                actor_user_id: actor_id,
                action: action.to_string(),
                before_json: before.map(snapshot_json),
                after_json: after.map(snapshot_json),
            })
            .await
            .context("写入审计日志失败")
    }

    fn invalidate(&self, chat_id: i64, action: &str, rule_id: i64) {
        self.cache.invalidate(chat_id);
        info!(event = events::RULE_CHANGED, chat_id, rule_id, action);
    }

    fn regex_warning(&self, rule: &RuleRecord) -> Option<String> {
        if rule.match_type != MatchKind::Regex.as_str() {
            return None;
        }
        let err = self.compiler.check_regex(&rule.pattern).err()?;
        warn!(
            event = events::RULE_REGEX_INVALID,
            chat_id = rule.group_id,
            rule_id = rule.id,
            error = %err,
            "保存的正则无法编译，规则不会生效"
        );
        Some(err.to_string())
    }
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    if value.trim().is_empty() {
        bail!("{}不能为空", field);
    }
    Ok(value.to_string())
}

fn snapshot_json(rule: &RuleRecord) -> String {
    json!({
        "id": rule.id,
        "match_type": rule.match_type,
        "pattern": rule.pattern,
        "reply": rule.reply,
        "priority": rule.priority,
        "enabled": rule.enabled,
        "delete_after": rule.delete_after,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::rules::test_support::MemoryDatabase;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryDatabase>, Arc<RuleCache>, RuleAdmin) {
        let db = Arc::new(MemoryDatabase::default());
        let cache = Arc::new(RuleCache::new(
            Duration::from_secs(60),
            RuleCompiler::default(),
        ));
        let admin = RuleAdmin::new(db.clone(), cache.clone(), RuleCompiler::default());
        (db, cache, admin)
    }

    fn request(kind: MatchKind, pattern: &str) -> CreateRuleRequest {
        CreateRuleRequest {
            chat_id: -1,
            actor_id: 9,
            match_kind: kind,
            pattern: pattern.to_string(),
            reply: "ok".to_string(),
            priority: None,
            delete_after: None,
            title: Some("测试群".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_invalidates_and_audits() {
        let (db, cache, admin) = setup();
        cache.set(-1, Vec::new());
        assert!(cache.get_if_fresh(-1).is_some());

        let outcome = admin.create_rule(request(MatchKind::Exact, "hi")).await.unwrap();
        assert_eq!(outcome.rule.priority, DEFAULT_PRIORITY);
        assert!(outcome.regex_warning.is_none());
        assert!(cache.get_if_fresh(-1).is_none());
        assert_eq!(db.ensured_groups(), vec![-1]);

        let audit = admin.audit_log(-1, 10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "create");
        assert!(audit[0].before_json.is_none());
        assert!(audit[0].after_json.as_deref().unwrap().contains("\"pattern\":\"hi\""));
    }

    #[tokio::test]
    async fn test_invalid_regex_is_saved_with_warning() {
        let (_db, _cache, admin) = setup();
        let outcome = admin
            .create_rule(request(MatchKind::Regex, "(open"))
            .await
            .unwrap();
        assert!(outcome.regex_warning.is_some());

        let fixed = admin
            .update_pattern(-1, outcome.rule.id, 9, "^open$")
            .await
            .unwrap();
        assert!(fixed.regex_warning.is_none());
        assert_eq!(fixed.rule.pattern, "^open$");
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let (_db, _cache, admin) = setup();
        assert!(admin.create_rule(request(MatchKind::Contains, "   ")).await.is_err());

        let mut req = request(MatchKind::Contains, "x");
        req.reply = "".to_string();
        assert!(admin.create_rule(req).await.is_err());
    }

    #[tokio::test]
    async fn test_every_mutation_invalidates() {
        let (_db, cache, admin) = setup();
        let id = admin
            .create_rule(request(MatchKind::Contains, "x"))
            .await
            .unwrap()
            .rule
            .id;

        cache.set(-1, Vec::new());
        admin.update_reply(-1, id, 9, "new").await.unwrap();
        assert!(cache.get_if_fresh(-1).is_none());

        cache.set(-1, Vec::new());
        let outcome = admin.set_delete_after(-1, id, 9, Some(0)).await.unwrap();
        assert_eq!(outcome.rule.delete_after, None);
        assert!(cache.get_if_fresh(-1).is_none());

        cache.set(-1, Vec::new());
        let outcome = admin.set_enabled(-1, id, 9, false).await.unwrap();
        assert!(!outcome.rule.enabled);
        assert!(cache.get_if_fresh(-1).is_none());

        cache.set(-1, Vec::new());
        admin.set_priority(-1, id, 9, 5).await.unwrap();
        assert!(cache.get_if_fresh(-1).is_none());

        cache.set(-1, Vec::new());
        assert!(admin.delete_rule(-1, id, 9).await.unwrap());
        assert!(cache.get_if_fresh(-1).is_none());
        assert!(!admin.delete_rule(-1, id, 9).await.unwrap());

        let actions: Vec<String> = admin
            .audit_log(-1, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                "delete",
                "update_priority",
                "disable",
                "update_delete_after",
                "update_reply",
                "create"
            ]
        );
    }

    #[tokio::test]
    async fn test_audit_failure_still_invalidates() {
        let (db, cache, admin) = setup();
        let id = admin
            .create_rule(request(MatchKind::Contains, "x"))
            .await
            .unwrap()
            .rule
            .id;
        db.fail_audit(true);

        cache.set(-1, Vec::new());
        assert!(admin.create_rule(request(MatchKind::Exact, "hi")).await.is_err());
        assert!(cache.get_if_fresh(-1).is_none());
        let stored = admin.list_rules(-1, 10, 0).await.unwrap();
        assert!(stored.iter().any(|r| r.pattern == "hi"));

        cache.set(-1, Vec::new());
        assert!(admin.update_reply(-1, id, 9, "new").await.is_err());
        assert!(cache.get_if_fresh(-1).is_none());
        assert_eq!(db.get_rule(-1, id).await.unwrap().unwrap().reply, "new");

        cache.set(-1, Vec::new());
        assert!(admin.delete_rule(-1, id, 9).await.is_err());
        assert!(cache.get_if_fresh(-1).is_none());
        assert!(db.get_rule(-1, id).await.unwrap().is_none());

        db.fail_audit(false);
        assert_eq!(admin.audit_log(-1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_rule_is_error() {
        let (_db, _cache, admin) = setup();
        assert!(admin.update_reply(-1, 404, 9, "x").await.is_err());
        assert!(admin.list_rules(-1, 10, 0).await.unwrap().is_empty());
    }
}
