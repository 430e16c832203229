use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 已发送消息的句柄，撤回时使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

/// 回复出口：由聊天平台适配层实现
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<MessageHandle>;

    /// 撤回此前发送的消息
    async fn delete_message(&self, handle: MessageHandle) -> Result<()>;
}
