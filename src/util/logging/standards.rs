//! Centralised logging metadata (event names, shared keys, etc.).

/// Canonical event names used across the service.
pub mod events {
    /// Service lifecycle.
    pub const BOOTSTRAP_START: &str = "bootstrap.start";
    pub const BOOTSTRAP_READY: &str = "bootstrap.ready";
    pub const BOOTSTRAP_SHUTDOWN: &str = "bootstrap.shutdown";

    /// Configuration.
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_TEMPLATE_WRITTEN: &str = "config.template_written";
    pub const CONFIG_ENV_OVERRIDE: &str = "config.env_override";
    pub const CONFIG_VALIDATION_WARNING: &str = "config.validation_warning";

    /// Storage.
    pub const DB_INIT: &str = "db.init";
    pub const DB_HEALTH: &str = "db.health";

    /// Rule compilation and evaluation.
    pub const RULE_REGEX_INVALID: &str = "rule.regex_invalid";
    pub const RULE_KIND_UNKNOWN: &str = "rule.kind_unknown";
    pub const RULE_EVAL_ERROR: &str = "rule.eval_error";
    pub const RULE_SKIPPED_THROTTLED: &str = "rule.skipped_throttled";
    pub const RULE_CHANGED: &str = "rule.changed";

    /// Rule cache.
    pub const CACHE_REFILL: &str = "rule_cache.refill";
    pub const CACHE_EXPIRED: &str = "rule_cache.expired";
    pub const CACHE_INSTALL: &str = "rule_cache.install";
    pub const CACHE_INSTALL_SKIPPED: &str = "rule_cache.install_skipped";
    pub const CACHE_INVALIDATE: &str = "rule_cache.invalidate";

    /// 冷却限流
    pub const THROTTLE_DENIED: &str = "throttle.denied";
    pub const THROTTLE_PRUNED: &str = "throttle.pruned";

    /// Message pipeline.
    pub const MESSAGE_ERROR: &str = "message.error";
    pub const REPLY_SENT: &str = "reply.sent";
    pub const REPLY_RETRACTED: &str = "reply.retracted";
    pub const REPLY_RETRACT_FAILED: &str = "reply.retract_failed";

    /// Console transport.
    pub const CONSOLE_EVENT_INVALID: &str = "console.event_invalid";
    pub const CONSOLE_ADMIN_FAILED: &str = "console.admin_failed";
    pub const CONSOLE_EOF: &str = "console.eof";
}
