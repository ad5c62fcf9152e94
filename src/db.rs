// ==========================================
// 重点款库存监控 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 首次启动时建表（CREATE TABLE IF NOT EXISTS，可重复执行）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
          version INTEGER PRIMARY KEY,
          applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
          scope_id TEXT PRIMARY KEY,
          scope_type TEXT NOT NULL,
          scope_key TEXT NOT NULL,
          created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
          scope_id TEXT NOT NULL REFERENCES config_scope(scope_id),
          key TEXT NOT NULL,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS threshold_overrides (
          item_name TEXT NOT NULL COLLATE NOCASE,
          size TEXT NOT NULL COLLATE NOCASE,
          color TEXT NOT NULL COLLATE NOCASE,
          threshold INTEGER NOT NULL CHECK(threshold >= 0),
          updated_at TEXT NOT NULL,
          UNIQUE (item_name, size, color)
        );

        CREATE TABLE IF NOT EXISTS threshold_history (
          entry_id TEXT PRIMARY KEY,
          item_name TEXT NOT NULL,
          size TEXT NOT NULL,
          color TEXT NOT NULL,
          old_threshold INTEGER,
          new_threshold INTEGER NOT NULL,
          changed_at TEXT NOT NULL,
          note TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_threshold_history_item
          ON threshold_history(item_name COLLATE NOCASE, changed_at);

        CREATE TABLE IF NOT EXISTS uploaded_files (
          file_id TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          file_path TEXT NOT NULL,
          size_bytes INTEGER NOT NULL DEFAULT 0,
          uploaded_at TEXT NOT NULL,
          is_active INTEGER NOT NULL DEFAULT 0
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
          VALUES ('global', 'GLOBAL', 'global');
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
