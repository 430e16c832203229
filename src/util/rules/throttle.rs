use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::util::logging::standards::events;

/// 按 (chat_id, rule_id) 的冷却闸门
///
/// 每个冷却窗口内同一键最多放行一次，没有突发额度。检查与记录在同一把锁内完成。
pub struct Throttle {
    cooldown: Duration,
    last_fired: Mutex<HashMap<(i64, i64), Instant>>,
}

impl Throttle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// 放行时记录当前时间；拒绝时不改动状态
    pub fn allow(&self, chat_id: i64, rule_id: i64) -> bool {
        let now = Instant::now();
        let mut guard = self.last_fired.lock();

        if let Some(last) = guard.get(&(chat_id, rule_id)) {
            if now.saturating_duration_since(*last) < self.cooldown {
                debug!(
                    event = events::THROTTLE_DENIED,
                    chat_id,
                    rule_id,
                    "规则处于冷却期"
                );
                return false;
            }
        }

        guard.insert((chat_id, rule_id), now);
        true
    }

    /// 清理已过冷却期的记录，这些键与从未触发的键行为一致
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.last_fired.lock();
        let before = guard.len();
        guard.retain(|_, last| now.saturating_duration_since(*last) < self.cooldown);
        before - guard.len()
    }

    pub fn len(&self) -> usize {
        self.last_fired.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
