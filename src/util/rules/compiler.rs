use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::db::traits::RuleRecord;
use crate::util::logging::standards::events;

use super::model::{MatchKind, Matcher, Rule};

/// 默认正则编译体积上限
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// 规则编译器：把存储记录转换成可执行规则
///
/// 正则按大小写不敏感、Unicode 感知方式预编译；编译失败只记录告警，
/// 规则以惰性状态保留，不影响同群其他规则的加载。
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    regex_size_limit: usize,
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_REGEX_SIZE_LIMIT)
    }
}

impl RuleCompiler {
    pub fn new(regex_size_limit: usize) -> Self {
        Self {
            regex_size_limit: regex_size_limit.max(1024),
        }
    }

    pub fn compile(&self, record: RuleRecord) -> Rule {
        let matcher = match record.match_type.parse::<MatchKind>() {
            Ok(MatchKind::Exact) => Matcher::Exact,
            Ok(MatchKind::Contains) => Matcher::Contains,
            Ok(MatchKind::Fuzzy) => Matcher::Fuzzy,
            Ok(MatchKind::Regex) => match self.build_regex(&record.pattern) {
                Ok(regex) => Matcher::Regex(Some(regex)),
                Err(err) => {
                    warn!(
                        event = events::RULE_REGEX_INVALID,
                        chat_id = record.group_id,
                        rule_id = record.id,
                        error = %err,
                        "正则编译失败，规则将被忽略"
                    );
                    Matcher::Regex(None)
                }
            },
            Err(()) => {
                warn!(
                    event = events::RULE_KIND_UNKNOWN,
                    chat_id = record.group_id,
                    rule_id = record.id,
                    match_type = %record.match_type,
                    "未知的匹配方式，规则将被忽略"
                );
                Matcher::Unsupported(record.match_type.clone())
            }
        };

        Rule {
            id: record.id,
            chat_id: record.group_id,
            matcher,
            pattern: record.pattern,
            reply: record.reply,
            priority: record.priority,
            enabled: record.enabled,
            delete_after: record
                .delete_after
                .filter(|secs| *secs > 0)
                .map(|secs| Duration::from_secs(secs as u64)),
        }
    }

    /// 单独校验正则，管理端保存前提示用
    pub fn check_regex(&self, pattern: &str) -> Result<(), regex::Error> {
        self.build_regex(pattern).map(|_| ())
    }

    fn build_regex(&self, pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .unicode(true)
            .size_limit(self.regex_size_limit)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::rules::test_support::record;

    #[test]
    fn test_compile_valid_regex() {
        let rule = RuleCompiler::default().compile(record(1, "regex", "^ab+c$"));
        match &rule.matcher {
            Matcher::Regex(Some(regex)) => assert!(regex.is_match("ABBBC")),
            other => panic!("应编译成功: {:?}", other),
        }
        assert!(!rule.is_inert());
    }

    #[test]
    fn test_invalid_regex_is_inert_not_fatal() {
        let rule = RuleCompiler::default().compile(record(2, "regex", "(unclosed"));
        assert!(matches!(rule.matcher, Matcher::Regex(None)));
        assert!(rule.is_inert());
        assert_eq!(rule.pattern, "(unclosed");
        assert_eq!(rule.match_kind(), Some(MatchKind::Regex));
    }

    #[test]
    fn test_oversized_regex_is_inert() {
        let compiler = RuleCompiler::new(1024);
        let rule = compiler.compile(record(3, "regex", r"\w{1000}"));
        assert!(rule.is_inert());
    }

    #[test]
    fn test_plain_kinds_keep_pattern_verbatim() {
        let compiler = RuleCompiler::default();
        let rule = compiler.compile(record(4, "exact", "  hi  "));
        assert!(matches!(rule.matcher, Matcher::Exact));
        assert_eq!(rule.pattern, "  hi  ");

        let rule = compiler.compile(record(5, "fuzzy", "hello"));
        assert!(matches!(rule.matcher, Matcher::Fuzzy));
    }

    #[test]
    fn test_unknown_kind_is_inert() {
        let rule = RuleCompiler::default().compile(record(6, "prefix", "x"));
        assert!(matches!(rule.matcher, Matcher::Unsupported(ref kind) if kind == "prefix"));
        assert_eq!(rule.match_kind(), None);
        assert!(rule.is_inert());
    }

    #[test]
    fn test_delete_after_zero_means_never() {
        let compiler = RuleCompiler::default();
        let mut rec = record(7, "contains", "x");
        rec.delete_after = Some(0);
        assert_eq!(compiler.compile(rec.clone()).delete_after, None);

        rec.delete_after = Some(30);
        assert_eq!(
            compiler.compile(rec).delete_after,
            Some(Duration::from_secs(30))
        );
    }
}
