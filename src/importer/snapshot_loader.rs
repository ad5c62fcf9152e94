// ==========================================
// 重点款库存监控 - 快照加载器
// ==========================================
// 流程: 文件读取 → 表头识别 → 款名/尺码派生 → 数量规整
// 输出: 不可变 InventorySnapshot（含非致命解析告警）
// ==========================================

use crate::domain::snapshot::{InventorySnapshot, ParseWarning, SnapshotSignature, VariantRecord};
use crate::domain::types::LogicalColumn;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{SnapshotSource, WorkbookReader};
use crate::importer::schema_resolver::{NormalizedRow, SchemaResolver};
use crate::importer::variant_key::VariantKeyExtractor;
use std::path::Path;
use std::time::Instant;

// ==========================================
// SnapshotLoader
// ==========================================
pub struct SnapshotLoader {
    reader: Box<dyn WorkbookReader>,
    resolver: SchemaResolver,
    extractor: VariantKeyExtractor,
}

impl SnapshotLoader {
    pub fn new() -> Self {
        Self::with_reader(Box::new(UniversalFileParser))
    }

    pub fn with_reader(reader: Box<dyn WorkbookReader>) -> Self {
        Self {
            reader,
            resolver: SchemaResolver::new(),
            extractor: VariantKeyExtractor::new(),
        }
    }

    fn to_record(&self, row: &NormalizedRow) -> (VariantRecord, Option<ParseWarning>) {
        let item_description = row.get(LogicalColumn::ItemDescription).to_string();
        let variant_code = row.get(LogicalColumn::VariantCode).to_string();
        let size = self.extractor.extract_size(&variant_code);

        let warning = if VariantKeyExtractor::is_unknown(&size) {
            Some(ParseWarning {
                row_number: row.row_number,
                variant_code: variant_code.clone(),
                message: format!("无法识别尺码: '{}'", variant_code),
            })
        } else {
            None
        };

        let record = VariantRecord {
            item_name: self.extractor.item_name(&item_description),
            item_description,
            color: row.get(LogicalColumn::VariantColor).to_string(),
            variant_code,
            size,
            quantity: coerce_quantity(row.get(LogicalColumn::Quantity)),
            season_code: row.get(LogicalColumn::SeasonCode).to_string(),
            row_number: row.row_number,
        };

        (record, warning)
    }
}

impl Default for SnapshotLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for SnapshotLoader {
    fn load_snapshot(&self, file_path: &Path) -> ImportResult<InventorySnapshot> {
        let start = Instant::now();

        // 签名取自读取前，保证缓存条目不会比内容更新
        let signature = SnapshotSignature::of(file_path)
            .map_err(|_| ImportError::FileNotFound(file_path.display().to_string()))?;

        let workbook = self.reader.read_workbook(file_path)?;
        let table = self.resolver.resolve(&workbook)?;

        let mut records = Vec::with_capacity(table.rows.len());
        let mut warnings = Vec::new();
        for row in &table.rows {
            let (record, warning) = self.to_record(row);
            if let Some(w) = warning {
                tracing::warn!(
                    file = %file_path.display(),
                    row = w.row_number,
                    variant_code = %w.variant_code,
                    "尺码无法识别，记为 Unknown"
                );
                warnings.push(w);
            }
            records.push(record);
        }

        tracing::info!(
            file = %file_path.display(),
            sheet = %table.sheet_name,
            header_row = table.header_row,
            rows = records.len(),
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "库存快照加载完成"
        );

        Ok(InventorySnapshot {
            signature,
            sheet_name: table.sheet_name,
            header_row: table.header_row,
            records,
            warnings,
        })
    }
}

/// 数量规整: 小数截断，负数归零，非数字/缺失记为 0
pub fn coerce_quantity(raw: &str) -> u32 {
    let text = raw.trim().replace(',', "");
    if text.is_empty() {
        return 0;
    }

    if let Ok(v) = text.parse::<i64>() {
        return v.clamp(0, u32::MAX as i64) as u32;
    }

    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(coerce_quantity("7"), 7);
        assert_eq!(coerce_quantity("7.9"), 7);
        assert_eq!(coerce_quantity("-3"), 0);
        assert_eq!(coerce_quantity("n/a"), 0);
        assert_eq!(coerce_quantity(""), 0);
        assert_eq!(coerce_quantity("1,200"), 1200);
    }

    #[test]
    fn test_load_snapshot_from_csv() {
        let file = write_csv(&[
            "Item Description,Variant Color,Variant Code,Grand Total,Season Code",
            "ANDRA - LEATHER JACKET,Black,990.XS,7,KI00",
            "ANDRA - LEATHER JACKET,Black,990.??,abc,KI00",
            "OLIVE - KNIT,Red,350M,12,FW24",
        ]);

        let snapshot = SnapshotLoader::new().load_snapshot(file.path()).unwrap();

        assert_eq!(snapshot.records.len(), 3);
        let first = &snapshot.records[0];
        assert_eq!(first.item_name, "ANDRA");
        assert_eq!(first.size, "XS");
        assert_eq!(first.quantity, 7);
        assert_eq!(first.row_number, 2);

        assert_eq!(snapshot.records[1].size, "Unknown");
        assert_eq!(snapshot.records[1].quantity, 0);
        assert_eq!(snapshot.warnings.len(), 1);
        assert_eq!(snapshot.warnings[0].row_number, 3);

        assert_eq!(snapshot.key_item_names("KI00"), vec!["ANDRA"]);
    }

    #[test]
    fn test_load_snapshot_schema_error() {
        let file = write_csv(&["Item Description,Variant Color", "ANDRA - X,Black"]);

        let err = SnapshotLoader::new().load_snapshot(file.path()).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let err = SnapshotLoader::new()
            .load_snapshot(Path::new("/nonexistent/inventory.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
