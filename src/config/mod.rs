// ==========================================
// 重点款库存监控 - 配置层
// ==========================================
// 职责: 运行配置加载，支持多级覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, MonitorConfig, DEFAULT_SIZE_THRESHOLD};
