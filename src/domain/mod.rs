// ==========================================
// 重点款库存监控 - 领域模型层
// ==========================================
// 职责: 定义快照、阈值、预警、对比等领域实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod alert;
pub mod comparison;
pub mod snapshot;
pub mod threshold;
pub mod types;

// 重导出核心类型
pub use alert::{
    AlertFeedEntry, AlertRecord, AlertReport, ColorTotal, ItemAlertSummary, ItemOptions,
    ThresholdChangeReport, ThresholdChangeSummary, WorsenedAlert, STATUS_LOW_STOCK,
};
pub use comparison::{
    ComparisonFeed, ComparisonRecord, ComparisonReport, ComparisonSummary, PerformanceEntry,
};
pub use snapshot::{
    InventorySnapshot, ParseWarning, SnapshotSignature, UploadedFileInfo, VariantRecord,
    UNKNOWN_SIZE,
};
pub use threshold::{
    PersistenceWarning, ThresholdChange, ThresholdHistoryEntry, ThresholdKey, ThresholdOverride,
    WILDCARD_COLOR,
};
pub use types::{Category, LogicalColumn, PerformanceLabel, Severity};
