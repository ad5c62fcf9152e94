// ==========================================
// 重点款库存监控 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行及外部协作方调用
// ==========================================

pub mod alert_api;
pub mod comparison_api;
pub mod error;
pub mod ingest_api;
pub mod snapshot_access;
pub mod threshold_api;

// 重导出核心类型
pub use alert_api::AlertApi;
pub use comparison_api::ComparisonApi;
pub use error::{ApiError, ApiResponse, ApiResult, ErrorBody};
pub use ingest_api::{IngestApi, UploadRegistration};
pub use snapshot_access::SnapshotAccess;
pub use threshold_api::{EffectiveThreshold, ThresholdAdminFeed, ThresholdApi};
