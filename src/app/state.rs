// ==========================================
// 重点款库存监控 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 装配顺序: 连接 → 配置 → Repository → 缓存/阈值 → API
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{AlertApi, ComparisonApi, IngestApi, SnapshotAccess, ThresholdApi};
use crate::config::{ConfigManager, MonitorConfig};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{AlertEngine, CacheStats, LatestFileResolver, SnapshotCache, ThresholdRegistry};
use crate::importer::SnapshotLoader;
use crate::repository::{
    threshold_repo::{SqliteThresholdRepository, ThresholdStore},
    uploaded_file_repo::{LatestFilePointer, SqliteUploadedFileRepository},
};
use std::time::Duration;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的运行配置
    pub config: MonitorConfig,

    pub config_manager: Arc<ConfigManager>,

    /// 派生结果缓存（所有 API 共用同一实例）
    pub cache: Arc<SnapshotCache>,

    pub thresholds: Arc<ThresholdRegistry>,

    /// 预警API
    pub alert_api: Arc<AlertApi>,

    /// 对比API
    pub comparison_api: Arc<ComparisonApi>,

    /// 阈值管理API
    pub threshold_api: Arc<ThresholdApi>,

    /// 上传接入API
    pub ingest_api: Arc<IngestApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 运行配置按 默认值 → config_kv → 环境变量 加载
    pub fn new(db_path: String) -> Result<Self, String> {
        let conn = Self::open(&db_path)?;
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;
        let config = config_manager
            .load_monitor_config()
            .map_err(|e| format!("运行配置加载失败: {}", e))?;

        Self::assemble(db_path, conn, Arc::new(config_manager), config)
    }

    /// 使用显式配置创建（测试/嵌入场景）
    pub fn with_config(db_path: String, config: MonitorConfig) -> Result<Self, String> {
        let conn = Self::open(&db_path)?;
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;

        Self::assemble(db_path, conn, Arc::new(config_manager), config)
    }

    fn open(db_path: &str) -> Result<Arc<Mutex<Connection>>, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        Ok(Arc::new(Mutex::new(conn)))
    }

    fn assemble(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        config: MonitorConfig,
    ) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let threshold_store: Arc<dyn ThresholdStore> =
            Arc::new(SqliteThresholdRepository::from_connection(conn.clone()));
        let file_pointer: Arc<dyn LatestFilePointer> =
            Arc::new(SqliteUploadedFileRepository::from_connection(conn));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let cache = Arc::new(SnapshotCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_entries,
        ));
        let thresholds = Arc::new(
            ThresholdRegistry::new(config.default_threshold, Some(threshold_store), cache.clone())
                .with_history_limit(config.history_limit_max),
        );
        let latest = Arc::new(LatestFileResolver::new(
            config.upload_dir.clone(),
            &config.file_extensions,
            Some(file_pointer),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let snapshots = Arc::new(SnapshotAccess::new(
            Arc::new(SnapshotLoader::new()),
            cache.clone(),
            latest.clone(),
        ));
        let alert_api = Arc::new(AlertApi::new(
            snapshots.clone(),
            thresholds.clone(),
            AlertEngine::new(&config.tracked_season_code),
        ));
        let comparison_api = Arc::new(ComparisonApi::new(
            snapshots,
            alert_api.clone(),
            config.top_movers_limit,
            &config.tracked_season_code,
        ));
        let threshold_api = Arc::new(ThresholdApi::new(thresholds.clone()));
        let ingest_api = Arc::new(
            IngestApi::new(cache.clone(), latest).with_retention_days(config.file_retention_days),
        );

        tracing::info!(
            upload_dir = %config.upload_dir.display(),
            default_threshold = config.default_threshold,
            tracked_season_code = %config.tracked_season_code,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            config,
            config_manager,
            cache,
            thresholds,
            alert_api,
            comparison_api,
            threshold_api,
            ingest_api,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// 启动预热: 在阻塞线程池中计算最新文件的批量预警
    ///
    /// 仅为优化，失败只记录日志
    pub async fn warm_caches(&self) -> bool {
        let alert_api = self.alert_api.clone();
        match tokio::task::spawn_blocking(move || alert_api.batch_alerts(None)).await {
            Ok(Ok(report)) => {
                tracing::info!(items = report.len(), "缓存预热完成");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "缓存预热跳过");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "缓存预热任务异常");
                false
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// - INVENTORY_MONITOR_DB_PATH 环境变量优先
/// - 开发环境: 用户数据目录/inventory-monitor-dev/inventory_monitor.db
/// - 生产环境: 用户数据目录/inventory-monitor/inventory_monitor.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("INVENTORY_MONITOR_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./inventory_monitor.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("inventory-monitor-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("inventory-monitor");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("inventory_monitor.db");
    }

    path.to_string_lossy().to_string()
}
