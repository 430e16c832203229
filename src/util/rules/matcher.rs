use thiserror::Error;
use tracing::warn;

use crate::util::logging::standards::events;

use super::fuzzy;
use super::model::{Matcher, Rule};

/// 模糊匹配默认阈值（0-100）
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 85;
/// 单条规则模糊对齐的默认计算量上限（64 位字操作数）
pub const DEFAULT_FUZZY_MAX_CELLS: u64 = 20_000_000;

/// 单条规则求值失败；调用方按未命中处理
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("fuzzy alignment needs {cells} cells, limit is {limit}")]
    FuzzyTooExpensive { cells: u64, limit: u64 },
}

/// 消息文本与单条规则的匹配判定
#[derive(Debug, Clone)]
pub struct MatchEvaluator {
    fuzzy_threshold: f64,
    fuzzy_max_cells: u64,
}

impl Default for MatchEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD, DEFAULT_FUZZY_MAX_CELLS)
    }
}

impl MatchEvaluator {
    pub fn new(fuzzy_threshold: u8, fuzzy_max_cells: u64) -> Self {
        Self {
            fuzzy_threshold: f64::from(fuzzy_threshold.min(100)),
            fuzzy_max_cells: fuzzy_max_cells.max(1),
        }
    }

    /// 求值失败只记录日志，视为未命中
    pub fn matches(&self, text: &str, rule: &Rule) -> bool {
        match self.evaluate(text, rule) {
            Ok(hit) => hit,
            Err(err) => {
                warn!(
                    event = events::RULE_EVAL_ERROR,
                    chat_id = rule.chat_id,
                    rule_id = rule.id,
                    error = %err,
                    "规则求值失败，按未命中处理"
                );
                false
            }
        }
    }

    pub fn evaluate(&self, text: &str, rule: &Rule) -> Result<bool, MatchError> {
        if !rule.enabled {
            return Ok(false);
        }

        let hit = match &rule.matcher {
            Matcher::Exact => text.trim() == rule.pattern.trim(),
            Matcher::Contains => text.contains(rule.pattern.as_str()),
            Matcher::Regex(Some(regex)) => regex.is_match(text),
            Matcher::Regex(None) => false,
            Matcher::Fuzzy => self.fuzzy_score(text, &rule.pattern)? >= self.fuzzy_threshold,
            Matcher::Unsupported(_) => false,
        };
        Ok(hit)
    }

    /// 模糊相似度，超出计算量上限时报错而不是阻塞消息处理
    pub fn fuzzy_score(&self, text: &str, pattern: &str) -> Result<f64, MatchError> {
        if !pattern.is_empty() && text.contains(pattern) {
            return Ok(100.0);
        }
        let cells = fuzzy::alignment_cost(pattern, text);
        if cells > self.fuzzy_max_cells {
            return Err(MatchError::FuzzyTooExpensive {
                cells,
                limit: self.fuzzy_max_cells,
            });
        }
        Ok(fuzzy::partial_ratio(pattern, text))
    }
}
