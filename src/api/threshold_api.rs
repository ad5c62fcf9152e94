// ==========================================
// 重点款库存监控 - 阈值管理 API
// ==========================================
// 职责: 设置/重置覆写、查询生效阈值、覆写列表与变更历史
// 管理界面协作方通过 admin_feed 获取展示数据
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::threshold::{ThresholdChange, ThresholdHistoryEntry, ThresholdOverride};
use crate::engine::threshold_registry::{ThresholdRegistry, ThresholdResolver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 默认历史条数
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 某 (款, 尺码, 颜色) 的生效阈值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveThreshold {
    pub item_name: String,
    pub size: String,
    pub color: String,
    pub threshold: u32,
    pub default_threshold: u32,
    /// 是否存在精确覆写
    pub has_override: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdAdminFeed {
    pub default_threshold: u32,
    pub overrides: Vec<ThresholdOverride>,
    pub history: Vec<ThresholdHistoryEntry>,
}

pub struct ThresholdApi {
    registry: Arc<ThresholdRegistry>,
}

impl ThresholdApi {
    pub fn new(registry: Arc<ThresholdRegistry>) -> Self {
        Self { registry }
    }

    pub fn set_threshold(
        &self,
        item_name: &str,
        size: &str,
        color: &str,
        threshold: i64,
    ) -> ApiResult<ThresholdChange> {
        let threshold = u32::try_from(threshold)
            .map_err(|_| ApiError::InvalidInput(format!("阈值必须为非负整数: {}", threshold)))?;
        Ok(self.registry.set(item_name, size, color, threshold)?)
    }

    pub fn reset_threshold(&self, item_name: &str, size: &str, color: &str) -> ApiResult<ThresholdChange> {
        Ok(self.registry.reset(item_name, size, color)?)
    }

    pub fn get_threshold(&self, item_name: &str, size: &str, color: &str) -> EffectiveThreshold {
        EffectiveThreshold {
            item_name: item_name.trim().to_string(),
            size: size.trim().to_string(),
            color: color.trim().to_string(),
            threshold: self.registry.resolve(item_name, size, color),
            default_threshold: self.registry.default_threshold(),
            has_override: self.registry.get_override(item_name, size, color).is_some(),
        }
    }

    pub fn list_overrides(&self) -> Vec<ThresholdOverride> {
        self.registry.overrides()
    }

    pub fn history(&self, item_filter: Option<&str>, limit: Option<usize>) -> Vec<ThresholdHistoryEntry> {
        self.registry
            .history(item_filter, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
    }

    pub fn admin_feed(&self, history_limit: Option<usize>) -> ThresholdAdminFeed {
        ThresholdAdminFeed {
            default_threshold: self.registry.default_threshold(),
            overrides: self.list_overrides(),
            history: self.history(None, history_limit),
        }
    }
}
