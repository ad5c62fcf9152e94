// ==========================================
// 重点款库存监控 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取，不做表头判断
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 每个工作表的原始单元格网格（表头行由 SchemaResolver 决定）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::WorkbookReader;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// CSV 文件对应的虚拟工作表名
pub const CSV_SHEET_NAME: &str = "csv";

// ==========================================
// RawSheet / RawWorkbook - 原始网格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSheet {
    pub name: String,
    /// 行 → 单元格文本（已 trim）
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(name: &str, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWorkbook {
    /// 来源文件（用于错误信息）
    pub source: String,
    pub sheets: Vec<RawSheet>,
}

impl RawWorkbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl WorkbookReader for CsvParser {
    fn read_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 不假定首行为表头
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.trim().to_string()).collect());
        }

        Ok(RawWorkbook {
            source: file_path.display().to_string(),
            sheets: vec![RawSheet::new(CSV_SHEET_NAME, rows)],
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl WorkbookReader for ExcelParser {
    fn read_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_names = workbook.sheet_names().to_owned();
        if sheet_names.is_empty() {
            return Err(ImportError::EmptyWorkbook(file_path.display().to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            // 单个工作表损坏不影响其他工作表的探测
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!(
                        file = %file_path.display(),
                        sheet = %sheet_name,
                        error = %e,
                        "工作表读取失败，跳过"
                    );
                    continue;
                }
            };

            let rows = range
                .rows()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.to_string().trim().to_string())
                        .collect()
                })
                .collect();

            sheets.push(RawSheet::new(&sheet_name, rows));
        }

        if sheets.is_empty() {
            return Err(ImportError::EmptyWorkbook(file_path.display().to_string()));
        }

        Ok(RawWorkbook {
            source: file_path.display().to_string(),
            sheets,
        })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl WorkbookReader for UniversalFileParser {
    fn read_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.read_workbook(file_path),
            "xlsx" | "xls" => ExcelParser.read_workbook(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_parser_keeps_leading_rows() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Inventory Report,,").unwrap();
        writeln!(temp_file, "Item Description,Variant Color,Grand Total").unwrap();
        writeln!(temp_file, "ANDRA - JACKET, Black ,7").unwrap();

        let workbook = CsvParser.read_workbook(temp_file.path()).unwrap();

        assert_eq!(workbook.sheets.len(), 1);
        let rows = &workbook.sheets[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "Inventory Report");
        assert_eq!(rows[2][1], "Black");
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.read_workbook(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.read_workbook(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_excel_parser_corrupt_file_is_load_error() {
        let mut temp_file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(temp_file, "this is not a zip archive").unwrap();

        let result = ExcelParser.read_workbook(temp_file.path());
        let err = result.unwrap_err();
        assert!(!err.is_schema_error());
    }
}
