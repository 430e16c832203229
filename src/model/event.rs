use serde::{Deserialize, Serialize};

use crate::db::traits::{AuditRecord, RuleRecord};
use crate::util::rules::{CreateRuleRequest, MessageHandle};

use super::message::InboundMessage;

fn default_page_size() -> u32 {
    20
}

/// 控制台输入的一行事件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(InboundMessage),
    Admin(AdminCommand),
}

/// 规则管理命令；调用方已完成权限校验
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminCommand {
    Create(CreateRuleRequest),
    UpdatePattern {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        pattern: String,
    },
    UpdateReply {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        reply: String,
    },
    SetDeleteAfter {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        #[serde(default)]
        seconds: Option<u32>,
    },
    Enable {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
    },
    Disable {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
    },
    SetPriority {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
        priority: i32,
    },
    Delete {
        chat_id: i64,
        rule_id: i64,
        actor_id: i64,
    },
    List {
        chat_id: i64,
        #[serde(default = "default_page_size")]
        limit: u32,
        #[serde(default)]
        offset: u32,
    },
    Audit {
        chat_id: i64,
        #[serde(default = "default_page_size")]
        limit: u32,
    },
}

/// 控制台输出的一行事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Reply {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Delete {
        chat_id: i64,
        message_id: i64,
    },
    Rule {
        rule: RuleRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        regex_warning: Option<String>,
    },
    Deleted {
        rule_id: i64,
        deleted: bool,
    },
    Rules {
        rules: Vec<RuleRecord>,
    },
    Audit {
        entries: Vec<AuditRecord>,
    },
    Error {
        message: String,
    },
}

impl OutboundEvent {
    pub fn delete(handle: MessageHandle) -> Self {
        OutboundEvent::Delete {
            chat_id: handle.chat_id,
            message_id: handle.message_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::rules::MatchKind;

    #[test]
    fn test_parse_message_event() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"message","chat_id":-100,"chat_kind":"supergroup","text":"hi"}"#,
        )
        .unwrap();
        let InboundEvent::Message(msg) = event else {
            panic!("应为消息事件");
        };
        assert_eq!(msg.chat_id, -100);
        assert_eq!(msg.matchable_text(), Some("hi"));
    }

    #[test]
    fn test_parse_admin_events() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"admin","action":"create","chat_id":-1,"actor_id":7,"match_kind":"fuzzy","pattern":"hello","reply":"hey"}"#,
        )
        .unwrap();
        let InboundEvent::Admin(AdminCommand::Create(req)) = event else {
            panic!("应为新建规则命令");
        };
        assert_eq!(req.match_kind, MatchKind::Fuzzy);
        assert_eq!(req.priority, None);

        let event: InboundEvent =
            serde_json::from_str(r#"{"type":"admin","action":"list","chat_id":-1}"#).unwrap();
        assert!(matches!(
            event,
            InboundEvent::Admin(AdminCommand::List {
                limit: 20,
                offset: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<InboundEvent>(r#"{"type":"sticker","chat_id":1}"#).is_err());
    }

    #[test]
    fn test_serialize_reply() {
        let line = serde_json::to_string(&OutboundEvent::Reply {
            chat_id: -1,
            message_id: 3,
            text: "ok".to_string(),
        })
        .unwrap();
        assert_eq!(line, r#"{"type":"reply","chat_id":-1,"message_id":3,"text":"ok"}"#);
    }
}
