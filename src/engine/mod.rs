// ==========================================
// 重点款库存监控 - 引擎层
// ==========================================
// 职责: 缓存、阈值解析、预警、对比、阈值变动分析、最新文件自愈
// 红线: Engine 不拼 SQL（持久化经由 repository 接口）
// ==========================================

pub mod alert;
pub mod cache;
pub mod comparison;
pub mod error;
pub mod latest_file;
pub mod threshold_analysis;
pub mod threshold_registry;

// 重导出核心引擎
pub use alert::{AlertEngine, DEFAULT_TRACKED_SEASON_CODE};
pub use cache::{
    CacheDeps, CacheKey, CacheStats, SnapshotCache, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS,
};
pub use comparison::{ComparisonEngine, DEFAULT_TOP_MOVERS_LIMIT};
pub use error::ThresholdError;
pub use latest_file::{FileCleanupReport, LatestFileResolver, DEFAULT_FILE_RETENTION_DAYS};
pub use threshold_analysis::ThresholdChangeAnalyzer;
pub use threshold_registry::{FixedThreshold, ThresholdRegistry, ThresholdResolver, HISTORY_LIMIT_MAX};
