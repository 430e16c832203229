use serde::{Deserialize, Serialize};

/// 会话类型，仅群组与超级群参与自动回复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    #[default]
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// 一条入站聊天消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    #[serde(default)]
    pub chat_kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub from_bot: bool,
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn group(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            chat_kind: ChatKind::Group,
            title: None,
            from_bot: false,
            text: Some(text.into()),
        }
    }

    /// 参与规则匹配的文本：群消息、非机器人、非空、非命令
    pub fn matchable_text(&self) -> Option<&str> {
        if !self.chat_kind.is_group() || self.from_bot {
            return None;
        }
        self.text
            .as_deref()
            .filter(|text| !text.is_empty() && !text.starts_with('/'))
    }
}
