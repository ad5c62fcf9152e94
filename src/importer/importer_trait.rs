// ==========================================
// 重点款库存监控 - 导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// ==========================================

use crate::domain::snapshot::InventorySnapshot;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawWorkbook;
use std::path::Path;

// ==========================================
// WorkbookReader Trait
// ==========================================
// 用途: 文件读取接口（阶段 0）
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait WorkbookReader: Send + Sync {
    /// 读取文件为原始工作表网格
    ///
    /// # 返回
    /// - Ok(RawWorkbook): 所有可读工作表
    /// - Err: 文件不存在、格式不支持、文件损坏（LoadError）
    fn read_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook>;
}

// ==========================================
// SnapshotSource Trait
// ==========================================
// 用途: 文件 → 库存快照（阶段 0-3 合并）
// 实现者: SnapshotLoader
pub trait SnapshotSource: Send + Sync {
    /// 加载并归一化库存文件
    ///
    /// # 返回
    /// - Ok(InventorySnapshot): 不可变快照（含非致命解析告警）
    /// - Err: LoadError / SchemaError
    fn load_snapshot(&self, file_path: &Path) -> ImportResult<InventorySnapshot>;
}
