// ==========================================
// 重点款库存监控 - 补货阈值领域模型
// ==========================================
// 职责: 阈值覆写、变更历史、持久化告警
// 约束: 阈值为非负整数（u32 表达）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 颜色通配符: 对 (款名, 尺码) 下所有颜色生效
pub const WILDCARD_COLOR: &str = "*";

/// 历史备注: 手动设置
pub const NOTE_MANUAL_SET: &str = "manual set";
/// 历史备注: 恢复默认
pub const NOTE_RESET_TO_DEFAULT: &str = "reset to default";

// ==========================================
// ThresholdKey - 阈值键 (款名, 尺码, 颜色)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThresholdKey {
    pub item_name: String,
    pub size: String,
    pub color: String,
}

impl ThresholdKey {
    pub fn new(item_name: &str, size: &str, color: &str) -> Self {
        Self {
            item_name: item_name.trim().to_string(),
            size: size.trim().to_string(),
            color: color.trim().to_string(),
        }
    }

    /// 大小写不敏感的查找键
    pub fn normalized(&self) -> ThresholdKey {
        ThresholdKey {
            item_name: self.item_name.to_uppercase(),
            size: self.size.to_uppercase(),
            color: self.color.to_uppercase(),
        }
    }

    pub fn is_wildcard_color(&self) -> bool {
        self.color == WILDCARD_COLOR
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.item_name, self.size, self.color)
    }
}

// ==========================================
// ThresholdOverride - 阈值覆写
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOverride {
    pub item_name: String,
    pub size: String,
    pub color: String,
    pub threshold: u32,
    pub updated_at: DateTime<Utc>,
}

impl ThresholdOverride {
    pub fn key(&self) -> ThresholdKey {
        ThresholdKey::new(&self.item_name, &self.size, &self.color)
    }
}

// ==========================================
// ThresholdHistoryEntry - 阈值变更历史（只追加）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdHistoryEntry {
    pub entry_id: String,
    pub item_name: String,
    pub size: String,
    pub color: String,
    /// 变更前的覆写值（无覆写时为 None）
    pub old_threshold: Option<u32>,
    pub new_threshold: u32,
    pub changed_at: DateTime<Utc>,
    pub note: Option<String>,
}

// ==========================================
// PersistenceWarning - 持久化告警（非致命）
// ==========================================
/// 阈值未能落库: 内存状态仍然生效，仅告知调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceWarning {
    pub key: ThresholdKey,
    pub message: String,
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "阈值持久化失败 ({}): {}", self.key, self.message)
    }
}

// ==========================================
// ThresholdChange - set/reset 的结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdChange {
    pub key: ThresholdKey,
    pub old_threshold: Option<u32>,
    pub new_threshold: u32,
    pub changed_at: DateTime<Utc>,
    /// 被失效的缓存条目数
    pub invalidated_cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_warning: Option<PersistenceWarning>,
}

impl ThresholdChange {
    pub fn is_persisted(&self) -> bool {
        self.persistence_warning.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization_is_case_insensitive() {
        let a = ThresholdKey::new("Andra", "xs", "Black ");
        let b = ThresholdKey::new("ANDRA", "XS", "black");
        assert_ne!(a, b);
        assert_eq!(a.normalized(), b.normalized());
        assert_eq!(a.to_string(), "Andra|xs|Black");
    }

    #[test]
    fn test_wildcard_color() {
        assert!(ThresholdKey::new("A", "S", "*").is_wildcard_color());
        assert!(!ThresholdKey::new("A", "S", "Red").is_wildcard_color());
    }
}
