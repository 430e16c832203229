//! 测试用的内存存储与回复出口

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::db::traits::*;

use super::sink::{MessageHandle, ReplySink};

pub(crate) fn record(id: i64, match_type: &str, pattern: &str) -> RuleRecord {
    RuleRecord {
        id,
        group_id: -1,
        match_type: match_type.to_string(),
        pattern: pattern.to_string(),
        reply: format!("reply-{}", id),
        priority: 100,
        enabled: true,
        delete_after: None,
        created_by: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryDatabase {
    rules: Mutex<BTreeMap<i64, RuleRecord>>,
    groups: Mutex<Vec<i64>>,
    audit: Mutex<Vec<AuditRecord>>,
    next_id: AtomicI64,
    list_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_audit: AtomicBool,
}

impl MemoryDatabase {
    pub(crate) fn put_rule(&self, rule: RuleRecord) {
        self.rules.lock().insert(rule.id, rule);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn ensured_groups(&self) -> Vec<i64> {
        self.groups.lock().clone()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_audit(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn ensure_group(&self, group_id: i64, title: Option<&str>) -> Result<GroupRecord> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("storage unavailable"));
        }
        let mut groups = self.groups.lock();
        if !groups.contains(&group_id) {
            groups.push(group_id);
        }
        Ok(GroupRecord {
            group_id,
            title: title.map(str::to_string),
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    async fn list_enabled_rules(&self, group_id: i64) -> Result<Vec<RuleRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("storage unavailable"));
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut rules: Vec<RuleRecord> = self
            .rules
            .lock()
            .values()
            .filter(|r| r.group_id == group_id && r.enabled)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (r.priority, r.id));
        Ok(rules)
    }

    async fn list_rules(&self, group_id: i64, limit: u32, offset: u32) -> Result<Vec<RuleRecord>> {
        let mut rules: Vec<RuleRecord> = self
            .rules
            .lock()
            .values()
            .filter(|r| r.group_id == group_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (!r.enabled, r.priority, r.id));
        Ok(rules
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_rule(&self, group_id: i64, rule_id: i64) -> Result<Option<RuleRecord>> {
        Ok(self
            .rules
            .lock()
            .get(&rule_id)
            .filter(|r| r.group_id == group_id)
            .cloned())
    }

    async fn create_rule(&self, rule: &NewRule) -> Result<RuleRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = RuleRecord {
            id,
            group_id: rule.group_id,
            match_type: rule.match_type.clone(),
            pattern: rule.pattern.clone(),
            reply: rule.reply.clone(),
            priority: rule.priority,
            enabled: rule.enabled,
            delete_after: rule.delete_after,
            created_by: rule.created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.put_rule(record.clone());
        Ok(record)
    }

    async fn update_rule(&self, rule: &RuleRecord) -> Result<()> {
        self.put_rule(rule.clone());
        Ok(())
    }

    async fn delete_rule(&self, group_id: i64, rule_id: i64) -> Result<bool> {
        let mut rules = self.rules.lock();
        if rules.get(&rule_id).is_some_and(|r| r.group_id == group_id) {
            rules.remove(&rule_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn add_audit(&self, entry: &NewAudit) -> Result<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(anyhow!("audit unavailable"));
        }
        let mut audit = self.audit.lock();
        let id = audit.len() as i64 + 1;
        audit.push(AuditRecord {
            id,
            group_id: entry.group_id,
            actor_user_id: entry.actor_user_id,
            action: entry.action.clone(),
            before_json: entry.before_json.clone(),
            after_json: entry.after_json.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_audit(&self, group_id: i64, limit: u32) -> Result<Vec<AuditRecord>> {
        Ok(self
            .audit
            .lock()
            .iter()
            .rev()
            .filter(|a| a.group_id == group_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail_reads.load(Ordering::SeqCst))
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<MessageHandle>>,
    fail_sends: AtomicBool,
}

impl RecordingSink {
    pub(crate) fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<MessageHandle> {
        self.deleted.lock().clone()
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<MessageHandle> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(anyhow!("chat unavailable"));
        }
        let mut sent = self.sent.lock();
        sent.push((chat_id, text.to_string()));
        Ok(MessageHandle {
            chat_id,
            message_id: sent.len() as i64,
        })
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<()> {
        self.deleted.lock().push(handle);
        Ok(())
    }
}
