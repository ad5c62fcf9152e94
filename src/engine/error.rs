// ==========================================
// 重点款库存监控 - 引擎层错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("阈值键无效 (字段 {field}): 不能为空")]
    EmptyKeyField { field: &'static str },
}
