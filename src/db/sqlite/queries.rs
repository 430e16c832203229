//! SQLite数据库查询操作
//! 包含所有数据库查询和操作的实现

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::traits::*;

const RULE_COLUMNS: &str = "id, group_id, match_type, pattern, reply, priority, enabled, \
     delete_after, created_by, created_at, updated_at";

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("无效的时间戳: {}", value))?
        .with_timezone(&Utc))
}

/// 群组查询操作
pub struct GroupQueries;

impl GroupQueries {
    pub async fn ensure(
        pool: &SqlitePool,
        group_id: i64,
        title: Option<&str>,
    ) -> Result<GroupRecord> {
        let now = Utc::now().to_rfc3339();

        // 标题为空时保持原值，只在确有变化时刷新
        sqlx::query(
            r#"
            INSERT INTO groups (group_id, title, enabled, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(group_id) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at
            WHERE excluded.title IS NOT NULL
              AND (groups.title IS NULL OR groups.title <> excluded.title)
            "#,
        )
        .bind(group_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        let row = sqlx::query(
            "SELECT group_id, title, enabled, created_at, updated_at FROM groups WHERE group_id = ?",
        )
        .bind(group_id)
        .fetch_one(pool)
        .await?;

        Self::row_to_record(row)
    }

    fn row_to_record(row: SqliteRow) -> Result<GroupRecord> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        Ok(GroupRecord {
            group_id: row.try_get("group_id")?,
            title: row.try_get("title")?,
            enabled: row.try_get("enabled")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

/// 规则查询操作
pub struct RuleQueries;

impl RuleQueries {
    pub async fn list_enabled(pool: &SqlitePool, group_id: i64) -> Result<Vec<RuleRecord>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE group_id = ? AND enabled = 1 ORDER BY priority ASC, id ASC",
            RULE_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(group_id).fetch_all(pool).await?;
        rows.into_iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>>>()
    }

    pub async fn list(
        pool: &SqlitePool,
        group_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RuleRecord>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE group_id = ? \
             ORDER BY enabled DESC, priority ASC, id ASC LIMIT ? OFFSET ?",
            RULE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(group_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(pool)
            .await?;
        rows.into_iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>>>()
    }

    pub async fn get(pool: &SqlitePool, group_id: i64, rule_id: i64) -> Result<Option<RuleRecord>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE group_id = ? AND id = ?",
            RULE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(group_id)
            .bind(rule_id)
            .fetch_optional(pool)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    pub async fn insert(pool: &SqlitePool, rule: &NewRule) -> Result<RuleRecord> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO rules (
                group_id, match_type, pattern, reply, priority, enabled,
                delete_after, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.group_id)
        .bind(&rule.match_type)
        .bind(&rule.pattern)
        .bind(&rule.reply)
        .bind(rule.priority)
        .bind(rule.enabled)
        .bind(rule.delete_after.map(i64::from))
        .bind(rule.created_by)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        Self::get(pool, rule.group_id, id)
            .await?
            .with_context(|| format!("新建规则 #{} 后读取失败", id))
    }

    pub async fn update(pool: &SqlitePool, rule: &RuleRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE rules SET
                pattern = ?,
                reply = ?,
                priority = ?,
                enabled = ?,
                delete_after = ?,
                updated_at = ?
            WHERE group_id = ? AND id = ?
            "#,
        )
        .bind(&rule.pattern)
        .bind(&rule.reply)
        .bind(rule.priority)
        .bind(rule.enabled)
        .bind(rule.delete_after.map(i64::from))
        .bind(Utc::now().to_rfc3339())
        .bind(rule.group_id)
        .bind(rule.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, group_id: i64, rule_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rules WHERE group_id = ? AND id = ?")
            .bind(group_id)
            .bind(rule_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_record(row: SqliteRow) -> Result<RuleRecord> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let delete_after: Option<i64> = row.try_get("delete_after")?;
        Ok(RuleRecord {
            id: row.try_get("id")?,
            group_id: row.try_get("group_id")?,
            match_type: row.try_get("match_type")?,
            pattern: row.try_get("pattern")?,
            reply: row.try_get("reply")?,
            priority: row.try_get("priority")?,
            enabled: row.try_get("enabled")?,
            delete_after: delete_after.and_then(|secs| u32::try_from(secs).ok()),
            created_by: row.try_get("created_by")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

/// 审计日志查询操作
pub struct AuditQueries;

impl AuditQueries {
    pub async fn insert(pool: &SqlitePool, entry: &NewAudit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (group_id, actor_user_id, action, before_json, after_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.group_id)
        .bind(entry.actor_user_id)
        .bind(&entry.action)
        .bind(&entry.before_json)
        .bind(&entry.after_json)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool, group_id: i64, limit: u32) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, group_id, actor_user_id, action, before_json, after_json, created_at
            FROM audit_log
            WHERE group_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(group_id)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at")?;
                Ok(AuditRecord {
                    id: row.try_get("id")?,
                    group_id: row.try_get("group_id")?,
                    actor_user_id: row.try_get("actor_user_id")?,
                    action: row.try_get("action")?,
                    before_json: row.try_get("before_json")?,
                    after_json: row.try_get("after_json")?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect::<Result<Vec<_>>>()
    }
}

/// 健康检查查询
pub struct HealthQueries;

impl HealthQueries {
    pub async fn check_health(pool: &SqlitePool) -> Result<bool> {
        let result = sqlx::query("SELECT 1 as health_check")
            .fetch_one(pool)
            .await;
        Ok(result.is_ok())
    }
}
