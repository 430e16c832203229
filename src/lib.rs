use std::sync::Arc;

pub mod build_info;
pub mod db;
pub mod model;
pub mod server;
pub mod util;

use db::Database;
use util::config::Config;
use util::rules::{MatchEvaluator, ReplySink, RuleAdmin, RuleCache, RuleCompiler, RuleEngine, Throttle};

/// 应用状态结构
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub database: Arc<dyn Database>,
    pub rule_cache: Arc<RuleCache>,
    pub throttle: Arc<Throttle>,
    pub engine: Arc<RuleEngine>,
    pub admin: Arc<RuleAdmin>,
}

impl AppState {
    /// 按配置组装规则引擎与管理入口，二者共享同一缓存
    pub fn new(config: Config, database: Arc<dyn Database>, sink: Arc<dyn ReplySink>) -> Self {
        let rules = &config.rules;
        let compiler = RuleCompiler::new(rules.regex_size_limit);
        let rule_cache = Arc::new(RuleCache::new(rules.cache_ttl(), compiler.clone()));
        let throttle = Arc::new(Throttle::new(rules.cooldown()));
        let evaluator = MatchEvaluator::new(rules.fuzzy_threshold, rules.fuzzy_max_cells);

        let engine = Arc::new(RuleEngine::new(
            database.clone(),
            rule_cache.clone(),
            throttle.clone(),
            evaluator,
            sink,
        ));
        let admin = Arc::new(RuleAdmin::new(database.clone(), rule_cache.clone(), compiler));

        Self {
            config,
            database,
            rule_cache,
            throttle,
            engine,
            admin,
        }
    }
}
