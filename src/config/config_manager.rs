// ==========================================
// 重点款库存监控 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 优先级: 内置默认值 → config_kv(global) → 环境变量
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::engine::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS, DEFAULT_FILE_RETENTION_DAYS, DEFAULT_TOP_MOVERS_LIMIT,
    DEFAULT_TRACKED_SEASON_CODE, HISTORY_LIMIT_MAX,
};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 默认低库存阈值
pub const DEFAULT_SIZE_THRESHOLD: u32 = 30;

// ==========================================
// MonitorConfig - 运行配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 上传文件存储目录
    pub upload_dir: PathBuf,
    pub default_threshold: u32,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    /// 非活动上传文件的保留天数
    pub file_retention_days: u32,
    /// 标记重点款的季节码
    pub tracked_season_code: String,
    pub top_movers_limit: usize,
    /// 可识别的库存文件扩展名
    pub file_extensions: Vec<String>,
    pub history_limit_max: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            default_threshold: DEFAULT_SIZE_THRESHOLD,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            file_retention_days: DEFAULT_FILE_RETENTION_DAYS,
            tracked_season_code: DEFAULT_TRACKED_SEASON_CODE.to_string(),
            top_movers_limit: DEFAULT_TOP_MOVERS_LIMIT,
            file_extensions: vec!["xlsx".to_string(), "xls".to_string(), "csv".to_string()],
            history_limit_max: HISTORY_LIMIT_MAX,
        }
    }
}

impl MonitorConfig {
    /// 按键覆写单个字段；值不可解析时记录告警并保留原值
    fn apply(&mut self, key: &str, raw: &str, source: &str) {
        let value = raw.trim();
        if value.is_empty() {
            return;
        }

        match key {
            config_keys::UPLOAD_DIR => self.upload_dir = PathBuf::from(value),
            config_keys::SIZE_THRESHOLD => parse_into(&mut self.default_threshold, key, value, source),
            config_keys::CACHE_TTL_SECS => parse_into(&mut self.cache_ttl_secs, key, value, source),
            config_keys::CACHE_MAX_ENTRIES => parse_into(&mut self.cache_max_entries, key, value, source),
            config_keys::FILE_RETENTION_DAYS => parse_into(&mut self.file_retention_days, key, value, source),
            config_keys::TRACKED_SEASON_CODE => self.tracked_season_code = value.to_string(),
            config_keys::TOP_MOVERS_LIMIT => parse_into(&mut self.top_movers_limit, key, value, source),
            config_keys::FILE_EXTENSIONS => {
                let exts: Vec<String> = value
                    .split(',')
                    .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect();
                if exts.is_empty() {
                    tracing::warn!(key, value, source, "配置值无效，已忽略");
                } else {
                    self.file_extensions = exts;
                }
            }
            config_keys::HISTORY_LIMIT_MAX => parse_into(&mut self.history_limit_max, key, value, source),
            _ => {}
        }
    }

    /// 以环境变量覆写（UPLOAD_DIR / SIZE_THRESHOLD / INVENTORY_CACHE_TTL_SECS / TRACKED_SEASON_CODE）
    pub fn apply_env(&mut self) {
        for (env_key, key) in config_keys::ENV_OVERRIDES {
            if let Ok(value) = std::env::var(env_key) {
                self.apply(key, &value, env_key);
            }
        }
    }
}

fn parse_into<T: FromStr>(target: &mut T, key: &str, value: &str, source: &str) {
    match value.parse::<T>() {
        Ok(v) => *target = v,
        Err(_) => tracing::warn!(key, value, source, "配置值无法解析，已忽略"),
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    /// 加载运行配置: 默认值 → config_kv → 环境变量
    pub fn load_monitor_config(&self) -> Result<MonitorConfig, Box<dyn Error>> {
        let mut config = MonitorConfig::default();

        for (key, value) in self.get_config_snapshot()? {
            config.apply(&key, &value, "config_kv");
        }
        config.apply_env();

        tracing::debug!(?config, "运行配置加载完成");
        Ok(config)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 文件存储
    pub const UPLOAD_DIR: &str = "upload_dir";
    pub const FILE_EXTENSIONS: &str = "file_extensions"; // 逗号分隔
    pub const FILE_RETENTION_DAYS: &str = "file_retention_days";

    // 阈值
    pub const SIZE_THRESHOLD: &str = "size_threshold";
    pub const HISTORY_LIMIT_MAX: &str = "history_limit_max";

    // 缓存
    pub const CACHE_TTL_SECS: &str = "cache_ttl_secs";
    pub const CACHE_MAX_ENTRIES: &str = "cache_max_entries";

    // 预警/对比
    pub const TRACKED_SEASON_CODE: &str = "tracked_season_code";
    pub const TOP_MOVERS_LIMIT: &str = "top_movers_limit";

    /// 环境变量 → 配置键
    pub const ENV_OVERRIDES: [(&str, &str); 4] = [
        ("UPLOAD_DIR", UPLOAD_DIR),
        ("SIZE_THRESHOLD", SIZE_THRESHOLD),
        ("INVENTORY_CACHE_TTL_SECS", CACHE_TTL_SECS),
        ("TRACKED_SEASON_CODE", TRACKED_SEASON_CODE),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.default_threshold, 30);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.tracked_season_code, "KI00");
        assert_eq!(config.top_movers_limit, 10);
        assert_eq!(config.history_limit_max, 500);
        assert_eq!(config.cache_max_entries, 256);
        assert_eq!(config.file_retention_days, 30);
    }

    #[test]
    fn test_config_kv_overrides_defaults() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::TOP_MOVERS_LIMIT, "5").unwrap();
        mgr.set_global_config_value(config_keys::FILE_EXTENSIONS, ".XLSX, csv").unwrap();
        mgr.set_global_config_value(config_keys::HISTORY_LIMIT_MAX, "not-a-number").unwrap();

        let mut config = MonitorConfig::default();
        for (k, v) in mgr.get_config_snapshot().unwrap() {
            config.apply(&k, &v, "test");
        }

        assert_eq!(config.top_movers_limit, 5);
        assert_eq!(config.file_extensions, vec!["xlsx", "csv"]);
        // 无法解析时保留默认值
        assert_eq!(config.history_limit_max, 500);
    }

    #[test]
    fn test_set_global_config_value_upserts() {
        let mgr = manager();
        mgr.set_global_config_value("upload_dir", "/a").unwrap();
        mgr.set_global_config_value("upload_dir", "/b").unwrap();
        assert_eq!(
            mgr.get_global_config_value("upload_dir").unwrap().as_deref(),
            Some("/b")
        );
        assert!(mgr.get_global_config_value("missing").unwrap().is_none());
    }
}
