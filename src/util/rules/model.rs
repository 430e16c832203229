use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 规则匹配方式，创建后不可变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Contains,
    Regex,
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Contains => "contains",
            MatchKind::Regex => "regex",
            MatchKind::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchKind::Exact),
            "contains" => Ok(MatchKind::Contains),
            "regex" => Ok(MatchKind::Regex),
            "fuzzy" => Ok(MatchKind::Fuzzy),
            _ => Err(()),
        }
    }
}

/// 编译后的匹配器
///
/// `Regex(None)` 表示表达式编译失败，规则保留但永不命中；
/// `Unsupported` 保存存储中无法识别的匹配方式，同样永不命中。
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact,
    Contains,
    Regex(Option<Regex>),
    Fuzzy,
    Unsupported(String),
}

impl Matcher {
    pub fn kind(&self) -> Option<MatchKind> {
        match self {
            Matcher::Exact => Some(MatchKind::Exact),
            Matcher::Contains => Some(MatchKind::Contains),
            Matcher::Regex(_) => Some(MatchKind::Regex),
            Matcher::Fuzzy => Some(MatchKind::Fuzzy),
            Matcher::Unsupported(_) => None,
        }
    }
}

/// 缓存中的可执行规则
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: i64,
    pub chat_id: i64,
    pub matcher: Matcher,
    pub pattern: String,
    pub reply: String,
    pub priority: i32,
    pub enabled: bool,
    pub delete_after: Option<Duration>,
}

impl Rule {
    /// 限流键 (chat_id, rule_id)
    pub fn cooldown_key(&self) -> (i64, i64) {
        (self.chat_id, self.id)
    }

    pub fn match_kind(&self) -> Option<MatchKind> {
        self.matcher.kind()
    }

    /// 编译失败或匹配方式未知的规则永不命中
    pub fn is_inert(&self) -> bool {
        matches!(self.matcher, Matcher::Regex(None) | Matcher::Unsupported(_))
    }

    pub(crate) fn sort_key(&self) -> (i32, i64) {
        (self.priority, self.id)
    }
}

/// 某个群在某一时刻的规则快照，装入缓存后不再修改
pub type RuleSet = Arc<[Rule]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_kind_parse() {
        assert_eq!("exact".parse::<MatchKind>(), Ok(MatchKind::Exact));
        assert_eq!(" Regex ".parse::<MatchKind>(), Ok(MatchKind::Regex));
        assert_eq!("FUZZY".parse::<MatchKind>(), Ok(MatchKind::Fuzzy));
        assert!("startswith".parse::<MatchKind>().is_err());
        assert_eq!(MatchKind::Contains.to_string(), "contains");
    }

    #[test]
    fn test_match_kind_serde_lowercase() {
        let json = serde_json::to_string(&MatchKind::Fuzzy).unwrap();
        assert_eq!(json, "\"fuzzy\"");
        let kind: MatchKind = serde_json::from_str("\"contains\"").unwrap();
        assert_eq!(kind, MatchKind::Contains);
    }
}
