use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::db::traits::RuleRecord;
use crate::util::logging::standards::events;

use super::compiler::RuleCompiler;
use super::model::{Rule, RuleSet};

/// 按群缓存的规则快照，减少频繁的数据库访问
///
/// 快照以 `Arc<[Rule]>` 整体替换，读者拿到的永远是完整、有序的一份；
/// 管理端写库后调用 [`RuleCache::invalidate`] 立即失效。
pub struct RuleCache {
    ttl: Duration,
    compiler: RuleCompiler,
    inner: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<i64, CachedRules>,
    /// 按群的失效代数，每次失效递增，用于丢弃失效前读到的旧数据
    epochs: HashMap<i64, u64>,
}

struct CachedRules {
    rules: RuleSet,
    loaded_at: Instant,
}

impl RuleCache {
    pub fn new(ttl: Duration, compiler: RuleCompiler) -> Self {
        Self {
            ttl,
            compiler,
            inner: RwLock::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 命中且未过期时返回快照；过期条目顺手驱逐
    pub fn get_if_fresh(&self, chat_id: i64) -> Option<RuleSet> {
        let stale_at = {
            let guard = self.inner.read();
            let entry = guard.entries.get(&chat_id)?;
            if entry.loaded_at.elapsed() <= self.ttl {
                return Some(entry.rules.clone());
            }
            entry.loaded_at
        };

        let mut guard = self.inner.write();
        // 只驱逐刚才看到的那份旧快照，并发装入的新快照保留
        if guard
            .entries
            .get(&chat_id)
            .is_some_and(|entry| entry.loaded_at == stale_at)
        {
            guard.entries.remove(&chat_id);
            debug!(event = events::CACHE_EXPIRED, chat_id, "规则缓存过期，已驱逐");
        }
        None
    }

    /// 编译、过滤禁用规则、按 (priority, id) 排序后整体装入
    pub fn set(&self, chat_id: i64, records: Vec<RuleRecord>) -> RuleSet {
        let rules = self.build_snapshot(records);
        self.install(chat_id, rules.clone());
        rules
    }

    /// 仅当读库期间没有发生失效时才装入；无论是否装入都返回本次快照
    pub fn set_if_current(&self, chat_id: i64, epoch: u64, records: Vec<RuleRecord>) -> RuleSet {
        let rules = self.build_snapshot(records);

        let mut guard = self.inner.write();
        if guard.epochs.get(&chat_id).copied().unwrap_or(0) == epoch {
            guard.entries.insert(
                chat_id,
                CachedRules {
                    rules: rules.clone(),
                    loaded_at: Instant::now(),
                },
            );
            debug!(event = events::CACHE_INSTALL, chat_id, rules = rules.len());
        } else {
            debug!(
                event = events::CACHE_INSTALL_SKIPPED,
                chat_id, "读库期间规则已变更，本次快照不入缓存"
            );
        }
        rules
    }

    /// 该群当前的失效代数，刷新前先取，配合 [`RuleCache::set_if_current`]
    pub fn epoch(&self, chat_id: i64) -> u64 {
        self.inner.read().epochs.get(&chat_id).copied().unwrap_or(0)
    }

    pub fn invalidate(&self, chat_id: i64) {
        let mut guard = self.inner.write();
        *guard.epochs.entry(chat_id).or_insert(0) += 1;
        if guard.entries.remove(&chat_id).is_some() {
            debug!(event = events::CACHE_INVALIDATE, chat_id, "规则缓存已失效");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn install(&self, chat_id: i64, rules: RuleSet) {
        let mut guard = self.inner.write();
        debug!(event = events::CACHE_INSTALL, chat_id, rules = rules.len());
        guard.entries.insert(
            chat_id,
            CachedRules {
                rules,
                loaded_at: Instant::now(),
            },
        );
    }

    fn build_snapshot(&self, records: Vec<RuleRecord>) -> RuleSet {
        let mut rules: Vec<Rule> = records
            .into_iter()
            .filter(|record| record.enabled)
            .map(|record| self.compiler.compile(record))
            .collect();
        rules.sort_by_key(Rule::sort_key);
        Arc::from(rules)
    }
}
