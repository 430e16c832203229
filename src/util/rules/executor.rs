use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::db::traits::Database;
use crate::model::message::InboundMessage;
use crate::util::logging::standards::events;

use super::cache::RuleCache;
use super::matcher::MatchEvaluator;
use super::model::{Rule, RuleSet};
use super::repository::RuleRepository;
use super::sink::{MessageHandle, ReplySink};
use super::throttle::Throttle;

/// 单条入站消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// 非群消息、机器人消息、空文本或命令
    Ignored,
    NoMatch,
    Replied { rule_id: i64, handle: MessageHandle },
}

/// 规则引擎入口：取规则快照、按序匹配、限流、至多回复一次
pub struct RuleEngine {
    repository: RuleRepository,
    cache: Arc<RuleCache>,
    throttle: Arc<Throttle>,
    evaluator: MatchEvaluator,
    sink: Arc<dyn ReplySink>,
}

impl RuleEngine {
    pub fn new(
        database: Arc<dyn Database>,
        cache: Arc<RuleCache>,
        throttle: Arc<Throttle>,
        evaluator: MatchEvaluator,
        sink: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            repository: RuleRepository::new(database),
            cache,
            throttle,
            evaluator,
            sink,
        }
    }

    pub async fn handle_message(&self, message: &InboundMessage) -> Result<HandleOutcome> {
        let Some(text) = message.matchable_text() else {
            return Ok(HandleOutcome::Ignored);
        };
        let chat_id = message.chat_id;

        let rules = self.rules_for(chat_id, message.title.as_deref()).await?;
        let Some(rule) = self.select(chat_id, text, &rules) else {
            return Ok(HandleOutcome::NoMatch);
        };

        let handle = self
            .sink
            .send_reply(chat_id, &rule.reply)
            .await
            .with_context(|| format!("群组 {} 规则 #{} 回复发送失败", chat_id, rule.id))?;

        info!(
            event = events::REPLY_SENT,
            chat_id,
            rule_id = rule.id,
            match_kind = rule.match_kind().map(|k| k.as_str()).unwrap_or("unknown"),
            message_id = handle.message_id
        );

        if let Some(delay) = rule.delete_after {
            self.schedule_delete(handle, delay);
        }

        Ok(HandleOutcome::Replied {
            rule_id: rule.id,
            handle,
        })
    }

    /// 缓存命中直接返回；否则读库、编译并装入
    pub async fn rules_for(&self, chat_id: i64, title: Option<&str>) -> Result<RuleSet> {
        if let Some(rules) = self.cache.get_if_fresh(chat_id) {
            return Ok(rules);
        }

        let epoch = self.cache.epoch(chat_id);
        let records = self.repository.load_enabled(chat_id, title).await?;
        debug!(
            event = events::CACHE_REFILL,
            chat_id,
            rules = records.len(),
            "规则缓存未命中，已从数据库加载"
        );
        Ok(self.cache.set_if_current(chat_id, epoch, records))
    }

    /// 按快照顺序找到第一条命中且未在冷却期的规则；冷却中的命中继续看下一条
    pub fn select<'a>(&self, chat_id: i64, text: &str, rules: &'a [Rule]) -> Option<&'a Rule> {
        for rule in rules {
            if !self.evaluator.matches(text, rule) {
                continue;
            }
            if self.throttle.allow(chat_id, rule.id) {
                return Some(rule);
            }
            debug!(
                event = events::RULE_SKIPPED_THROTTLED,
                chat_id,
                rule_id = rule.id,
                "命中规则处于冷却期，继续匹配后续规则"
            );
        }
        None
    }

    fn schedule_delete(&self, handle: MessageHandle, delay: Duration) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match sink.delete_message(handle).await {
                Ok(()) => debug!(
                    event = events::REPLY_RETRACTED,
                    chat_id = handle.chat_id,
                    message_id = handle.message_id
                ),
                // 可能已被手动删除或没有权限
                Err(err) => debug!(
                    event = events::REPLY_RETRACT_FAILED,
                    chat_id = handle.chat_id,
                    message_id = handle.message_id,
                    error = %err
                ),
            }
        });
    }
}
