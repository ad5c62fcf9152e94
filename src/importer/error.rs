// ==========================================
// 重点款库存监控 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: LoadError（文件不可读/损坏）/ SchemaError（找不到必需列）
// ==========================================

use crate::domain::types::LogicalColumn;
use thiserror::Error;

// ==========================================
// SchemaError - 所有工作表/表头行组合都不满足必需列
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未找到必需列 (文件 {file}): {}", format_columns(.missing_columns))]
pub struct SchemaError {
    pub file: String,
    /// 始终无法匹配的逻辑列
    pub missing_columns: Vec<LogicalColumn>,
    /// 尝试过的工作表
    pub sheets_tried: Vec<String>,
}

fn format_columns(columns: &[LogicalColumn]) -> String {
    columns
        .iter()
        .map(|c| c.canonical_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 (LoadError) =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件无工作表或无数据: {0}")]
    EmptyWorkbook(String),

    // ===== 表头/列识别错误 =====
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ImportError {
    /// 是否为列识别失败（其余均为文件加载失败）
    pub fn is_schema_error(&self) -> bool {
        matches!(self, ImportError::Schema(_))
    }

    pub fn missing_columns(&self) -> Option<&[LogicalColumn]> {
        match self {
            ImportError::Schema(e) => Some(&e.missing_columns),
            _ => None,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
