// ==========================================
// 重点款库存监控 - 补货阈值仓储
// ==========================================
// 红线: Repository 不含业务逻辑（优先级解析在 ThresholdRegistry）
// 表: threshold_overrides（键大小写不敏感）/ threshold_history（只追加）
// 约束: 覆写写入与历史追加在同一事务内完成
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::threshold::{ThresholdHistoryEntry, ThresholdKey, ThresholdOverride};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ThresholdStore Trait
// ==========================================
// 用途: 阈值持久化接口（注册表只依赖该接口，便于测试注入失败存储）
pub trait ThresholdStore: Send + Sync {
    /// 加载全部覆写
    fn load_overrides(&self) -> RepositoryResult<Vec<ThresholdOverride>>;

    /// 查询变更历史（最新在前）
    fn load_history(
        &self,
        item_filter: Option<&str>,
        limit: usize,
    ) -> RepositoryResult<Vec<ThresholdHistoryEntry>>;

    /// 写入/更新覆写并追加历史
    fn save_override(
        &self,
        value: &ThresholdOverride,
        history: &ThresholdHistoryEntry,
    ) -> RepositoryResult<()>;

    /// 删除覆写并追加历史
    fn delete_override(
        &self,
        key: &ThresholdKey,
        history: &ThresholdHistoryEntry,
    ) -> RepositoryResult<()>;
}

// ==========================================
// SqliteThresholdRepository
// ==========================================
pub struct SqliteThresholdRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteThresholdRepository {
    /// 创建新的仓储实例（自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn insert_history(conn: &Connection, entry: &ThresholdHistoryEntry) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO threshold_history (
                entry_id, item_name, size, color,
                old_threshold, new_threshold, changed_at, note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.entry_id,
                entry.item_name,
                entry.size,
                entry.color,
                entry.old_threshold,
                entry.new_threshold,
                format_timestamp(&entry.changed_at),
                entry.note,
            ],
        )?;
        Ok(())
    }
}

/// 固定精度，保证按文本排序即按时间排序
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_override(row: &Row<'_>) -> rusqlite::Result<ThresholdOverride> {
    Ok(ThresholdOverride {
        item_name: row.get(0)?,
        size: row.get(1)?,
        color: row.get(2)?,
        threshold: row.get(3)?,
        updated_at: parse_timestamp(4, row.get(4)?)?,
    })
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<ThresholdHistoryEntry> {
    Ok(ThresholdHistoryEntry {
        entry_id: row.get(0)?,
        item_name: row.get(1)?,
        size: row.get(2)?,
        color: row.get(3)?,
        old_threshold: row.get(4)?,
        new_threshold: row.get(5)?,
        changed_at: parse_timestamp(6, row.get(6)?)?,
        note: row.get(7)?,
    })
}

impl ThresholdStore for SqliteThresholdRepository {
    fn load_overrides(&self) -> RepositoryResult<Vec<ThresholdOverride>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT item_name, size, color, threshold, updated_at
            FROM threshold_overrides
            ORDER BY item_name, size, color
            "#,
        )?;

        let rows = stmt
            .query_map([], map_override)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn load_history(
        &self,
        item_filter: Option<&str>,
        limit: usize,
    ) -> RepositoryResult<Vec<ThresholdHistoryEntry>> {
        let conn = self.get_conn()?;
        let limit = limit as i64;

        let entries = match item_filter {
            Some(item) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT entry_id, item_name, size, color,
                           old_threshold, new_threshold, changed_at, note
                    FROM threshold_history
                    WHERE item_name = ?1 COLLATE NOCASE
                    ORDER BY changed_at DESC, rowid DESC
                    LIMIT ?2
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![item, limit], map_history)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT entry_id, item_name, size, color,
                           old_threshold, new_threshold, changed_at, note
                    FROM threshold_history
                    ORDER BY changed_at DESC, rowid DESC
                    LIMIT ?1
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![limit], map_history)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(entries)
    }

    fn save_override(
        &self,
        value: &ThresholdOverride,
        history: &ThresholdHistoryEntry,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO threshold_overrides (item_name, size, color, threshold, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(item_name, size, color) DO UPDATE SET
                threshold = excluded.threshold,
                updated_at = excluded.updated_at
            "#,
            params![
                value.item_name,
                value.size,
                value.color,
                value.threshold,
                format_timestamp(&value.updated_at),
            ],
        )?;
        Self::insert_history(&tx, history)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_override(
        &self,
        key: &ThresholdKey,
        history: &ThresholdHistoryEntry,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM threshold_overrides WHERE item_name = ?1 AND size = ?2 AND color = ?3",
            params![key.item_name, key.size, key.color],
        )?;
        Self::insert_history(&tx, history)?;

        tx.commit()?;
        Ok(())
    }
}
