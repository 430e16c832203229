//! 控制台传输
//!
//! 从 stdin 逐行读取 JSON 事件，回复与撤回以 JSON 行写到 stdout。
//! 每个事件在独立任务中处理。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::model::{AdminCommand, InboundEvent, InboundMessage, OutboundEvent};
use crate::util::logging::standards::events;
use crate::util::rules::{HandleOutcome, MessageHandle, ReplySink};
use crate::AppState;

/// 串行化的 JSON 行输出
pub struct LineWriter<W> {
    inner: Mutex<W>,
}

impl<W> LineWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub async fn write_event(&self, event: &OutboundEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut out = self.inner.lock().await;
        out.write_all(&line).await.context("写出事件失败")?;
        out.flush().await?;
        Ok(())
    }
}

/// 把回复写成控制台事件的回复出口
pub struct ConsoleReplySink<W> {
    out: Arc<LineWriter<W>>,
    next_message_id: AtomicI64,
}

impl<W> ConsoleReplySink<W> {
    pub fn new(out: Arc<LineWriter<W>>) -> Self {
        Self {
            out,
            next_message_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl<W> ReplySink for ConsoleReplySink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<MessageHandle> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        self.out
            .write_event(&OutboundEvent::Reply {
                chat_id,
                message_id,
                text: text.to_string(),
            })
            .await?;
        Ok(MessageHandle {
            chat_id,
            message_id,
        })
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<()> {
        self.out.write_event(&OutboundEvent::delete(handle)).await
    }
}

/// 控制台事件循环
pub struct ConsoleTransport<W> {
    state: AppState,
    out: Arc<LineWriter<W>>,
}

impl<W> ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(state: AppState, out: Arc<LineWriter<W>>) -> Self {
        Self { state, out }
    }

    /// 读到 EOF 为止，并等待已派发的事件处理完
    pub async fn run<R>(self: Arc<Self>, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut tasks = JoinSet::new();

        while let Some(line) = lines.next_line().await.context("读取输入失败")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event = match serde_json::from_str::<InboundEvent>(line) {
                Ok(event) => event,
                Err(e) => {
                    warn!(event = events::CONSOLE_EVENT_INVALID, error = %e, "无法解析输入事件");
                    self.write_error(format!("无法解析输入事件: {}", e)).await;
                    continue;
                }
            };

            let transport = self.clone();
            tasks.spawn(async move { transport.dispatch(event).await });

            // 回收已完成的任务
            while tasks.try_join_next().is_some() {}
        }

        while tasks.join_next().await.is_some() {}
        info!(event = events::CONSOLE_EOF, "输入结束");
        Ok(())
    }

    pub async fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message(message) => self.handle_message(message).await,
            InboundEvent::Admin(command) => {
                let result = match self.apply_admin(command).await {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(event = events::CONSOLE_ADMIN_FAILED, error = %e);
                        OutboundEvent::Error {
                            message: format!("{:#}", e),
                        }
                    }
                };
                if let Err(e) = self.out.write_event(&result).await {
                    error!(event = events::CONSOLE_ADMIN_FAILED, error = %e, "写出管理结果失败");
                }
            }
        }
    }

    async fn handle_message(&self, message: InboundMessage) {
        match self.state.engine.handle_message(&message).await {
            Ok(HandleOutcome::Replied { rule_id, .. }) => {
                debug!(chat_id = message.chat_id, rule_id, "消息已回复")
            }
            Ok(_) => {}
            Err(e) => error!(
                event = events::MESSAGE_ERROR,
                chat_id = message.chat_id,
                error = %format!("{:#}", e)
            ),
        }
    }

    async fn apply_admin(&self, command: AdminCommand) -> Result<OutboundEvent> {
        let admin = &self.state.admin;
        let outcome = match command {
            AdminCommand::Create(request) => admin.create_rule(request).await?,
            AdminCommand::UpdatePattern {
                chat_id,
                rule_id,
                actor_id,
                pattern,
            } => {
                admin
                    .update_pattern(chat_id, rule_id, actor_id, &pattern)
                    .await?
            }
            AdminCommand::UpdateReply {
                chat_id,
                rule_id,
                actor_id,
                reply,
            } => admin.update_reply(chat_id, rule_id, actor_id, &reply).await?,
            AdminCommand::SetDeleteAfter {
                chat_id,
                rule_id,
                actor_id,
                seconds,
            } => {
                admin
                    .set_delete_after(chat_id, rule_id, actor_id, seconds)
                    .await?
            }
            AdminCommand::Enable {
                chat_id,
                rule_id,
                actor_id,
            } => admin.set_enabled(chat_id, rule_id, actor_id, true).await?,
            AdminCommand::Disable {
                chat_id,
                rule_id,
                actor_id,
            } => admin.set_enabled(chat_id, rule_id, actor_id, false).await?,
            AdminCommand::SetPriority {
                chat_id,
                rule_id,
                actor_id,
                priority,
            } => {
                admin
                    .set_priority(chat_id, rule_id, actor_id, priority)
                    .await?
            }
            AdminCommand::Delete {
                chat_id,
                rule_id,
                actor_id,
            } => {
                let deleted = admin.delete_rule(chat_id, rule_id, actor_id).await?;
                return Ok(OutboundEvent::Deleted { rule_id, deleted });
            }
            AdminCommand::List {
                chat_id,
                limit,
                offset,
            } => {
                let rules = admin.list_rules(chat_id, limit, offset).await?;
                return Ok(OutboundEvent::Rules { rules });
            }
            AdminCommand::Audit { chat_id, limit } => {
                let entries = admin.audit_log(chat_id, limit).await?;
                return Ok(OutboundEvent::Audit { entries });
            }
        };

        Ok(OutboundEvent::Rule {
            rule: outcome.rule,
            regex_warning: outcome.regex_warning,
        })
    }

    async fn write_error(&self, message: String) {
        if let Err(e) = self.out.write_event(&OutboundEvent::Error { message }).await {
            error!(event = events::CONSOLE_EVENT_INVALID, error = %e, "写出错误事件失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::traits::Database;
    use crate::util::config::Config;
    use crate::util::rules::test_support::MemoryDatabase;
    use serde_json::Value;

    fn transport() -> Arc<ConsoleTransport<Vec<u8>>> {
        let out = Arc::new(LineWriter::new(Vec::new()));
        let database: Arc<dyn Database> = Arc::new(MemoryDatabase::default());
        let sink = Arc::new(ConsoleReplySink::new(out.clone()));
        let state = AppState::new(Config::default(), database, sink);
        Arc::new(ConsoleTransport::new(state, out))
    }

    async fn output(transport: Arc<ConsoleTransport<Vec<u8>>>) -> Vec<Value> {
        let out = transport.out.inner.lock().await;
        String::from_utf8(out.clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn event(json: &str) -> InboundEvent {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_admin_then_message_round_trip() {
        let t = transport();
        t.dispatch(event(
            r#"{"type":"admin","action":"create","chat_id":-5,"actor_id":1,"match_kind":"contains","pattern":"price","reply":"see pinned"}"#,
        ))
        .await;
        t.dispatch(event(
            r#"{"type":"message","chat_id":-5,"text":"what is the price?"}"#,
        ))
        .await;

        let lines = output(t).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "rule");
        assert_eq!(lines[0]["rule"]["pattern"], "price");
        assert_eq!(lines[1]["type"], "reply");
        assert_eq!(lines[1]["chat_id"], -5);
        assert_eq!(lines[1]["text"], "see pinned");
    }

    #[tokio::test]
    async fn test_admin_failure_is_reported() {
        let t = transport();
        t.dispatch(event(
            r#"{"type":"admin","action":"update_reply","chat_id":-5,"rule_id":99,"actor_id":1,"reply":"x"}"#,
        ))
        .await;

        let lines = output(t).await;
        assert_eq!(lines[0]["type"], "error");
    }

    #[tokio::test]
    async fn test_run_skips_bad_lines_and_drains_tasks() {
        let t = transport();
        let input = b"not json\n\n{\"type\":\"admin\",\"action\":\"list\",\"chat_id\":-5}\n";
        t.clone().run(&input[..]).await.unwrap();

        let lines = output(t).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "error");
        assert_eq!(lines[1]["type"], "rules");
        assert_eq!(lines[1]["rules"], Value::Array(Vec::new()));
    }
}
