// ==========================================
// 重点款库存监控 - 导入层
// ==========================================
// 职责: 库存文件 → 不可变快照
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod importer_trait;
pub mod schema_resolver;
pub mod snapshot_loader;
pub mod variant_key;

// 重导出核心类型
pub use error::{ImportError, ImportResult, SchemaError};
pub use file_parser::{CsvParser, ExcelParser, RawSheet, RawWorkbook, UniversalFileParser};
pub use schema_resolver::{NormalizedRow, NormalizedTable, SchemaResolver};
pub use snapshot_loader::{coerce_quantity, SnapshotLoader};
pub use variant_key::VariantKeyExtractor;

// 重导出 Trait 接口
pub use importer_trait::{SnapshotSource, WorkbookReader};
