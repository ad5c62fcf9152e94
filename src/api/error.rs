// ==========================================
// 重点款库存监控 - API层错误类型
// ==========================================
// 职责: 将各层技术错误转换为用户可读的结构化错误
// 约定: 输入不可读时必须返回错误，不返回空的成功结果
// ==========================================

use crate::domain::types::LogicalColumn;
use crate::engine::error::ThresholdError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入文件错误
    // ==========================================
    /// 文件不可读/损坏（仅影响该文件）
    #[error("文件加载失败: {0}")]
    LoadError(String),

    /// 找不到必需列
    #[error("{message}")]
    SchemaError {
        message: String,
        missing_columns: Vec<LogicalColumn>,
    },

    #[error("未找到库存文件: {0}")]
    NoInventoryFile(String),

    /// 文件中没有重点款
    #[error("No key items found in file: {file}")]
    NoKeyItems { file: String },

    /// 对比时某一期没有跟踪季节码的记录
    #[error("No {season_code} items found in {position} file")]
    NoTrackedItems {
        season_code: String,
        position: &'static str,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定的错误分类码（供调用方分支处理）
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::LoadError(_) => "LOAD_ERROR",
            ApiError::SchemaError { .. } => "SCHEMA_ERROR",
            ApiError::NoInventoryFile(_) => "NO_INVENTORY_FILE",
            ApiError::NoKeyItems { .. } => "NO_KEY_ITEMS",
            ApiError::NoTrackedItems { .. } => "NO_TRACKED_ITEMS",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DatabaseError(_) | ApiError::DatabaseConnectionError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Schema(schema) => ApiError::SchemaError {
                message: schema.to_string(),
                missing_columns: schema.missing_columns,
            },
            other => ApiError::LoadError(other.to_string()),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => ApiError::NotFound(what),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            corrupt @ RepositoryError::CorruptRow { .. } => ApiError::DatabaseError(corrupt.to_string()),
        }
    }
}

impl From<ThresholdError> for ApiError {
    fn from(err: ThresholdError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// ApiResponse - 成功标志 + 错误信息 的统一响应
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_columns: Option<Vec<String>>,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        let missing_columns = match err {
            ApiError::SchemaError { missing_columns, .. } => Some(
                missing_columns
                    .iter()
                    .map(|c| c.canonical_name().to_string())
                    .collect(),
            ),
            _ => None,
        };

        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            missing_columns,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => {
                tracing::debug!(kind = err.kind(), error = %err, "API 调用失败");
                Self {
                    success: false,
                    data: None,
                    error: Some(ErrorBody::from(&err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::SchemaError;

    #[test]
    fn test_schema_error_envelope_lists_columns() {
        let err = ApiError::from(ImportError::from(SchemaError {
            file: "inventory.xlsx".to_string(),
            missing_columns: vec![LogicalColumn::Quantity],
            sheets_tried: vec!["Sheet1".to_string()],
        }));

        let response: ApiResponse<()> = Err(err).into();
        assert!(!response.success);
        let body = response.error.unwrap();
        assert_eq!(body.kind, "SCHEMA_ERROR");
        assert_eq!(body.missing_columns, Some(vec!["Quantity".to_string()]));
    }

    #[test]
    fn test_load_error_and_success() {
        let err = ApiError::from(ImportError::FileNotFound("a.xlsx".to_string()));
        assert_eq!(err.kind(), "LOAD_ERROR");

        let ok: ApiResponse<u32> = Ok(7).into();
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());
    }

    #[test]
    fn test_no_tracked_items_message() {
        let err = ApiError::NoTrackedItems {
            season_code: "KI00".to_string(),
            position: "first",
        };
        assert_eq!(err.to_string(), "No KI00 items found in first file");
    }
}
