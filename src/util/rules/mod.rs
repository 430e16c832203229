mod admin;
mod cache;
mod compiler;
mod executor;
mod fuzzy;
mod matcher;
mod model;
mod repository;
mod sink;
mod throttle;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{AdminOutcome, CreateRuleRequest, RuleAdmin, DEFAULT_PRIORITY};
pub use cache::RuleCache;
pub use compiler::{RuleCompiler, DEFAULT_REGEX_SIZE_LIMIT};
pub use executor::{HandleOutcome, RuleEngine};
pub use matcher::{MatchError, MatchEvaluator, DEFAULT_FUZZY_MAX_CELLS, DEFAULT_FUZZY_THRESHOLD};
pub use model::*;
pub use repository::RuleRepository;
pub use sink::{MessageHandle, ReplySink};
pub use throttle::Throttle;
