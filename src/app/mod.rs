// ==========================================
// 重点款库存监控 - 应用层
// ==========================================
// 职责: 装配 Repository / Engine / API，提供共享状态
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
