// ==========================================
// 重点款库存监控 - 低库存预警领域模型
// ==========================================
// 职责: 预警记录、款式汇总、预警输出、阈值变动分析结果
// 红线: 仅当 库存 < 阈值 时产生预警，缺口恒 >= 1
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 预警输出中的状态字段
pub const STATUS_LOW_STOCK: &str = "LOW STOCK";

// ==========================================
// AlertRecord - 单个变体的缺货预警
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub item_name: String,
    pub item_description: String,
    pub variant_code: String,
    pub color: String,
    pub size: String,
    pub stock_level: u32,
    pub threshold: u32,
    /// threshold - stock_level
    pub shortage: u32,
}

impl AlertRecord {
    /// 构造预警；库存未低于阈值时返回 None
    pub fn below_threshold(
        item_name: &str,
        item_description: &str,
        variant_code: &str,
        color: &str,
        size: &str,
        stock_level: u32,
        threshold: u32,
    ) -> Option<Self> {
        if stock_level >= threshold {
            return None;
        }
        Some(Self {
            item_name: item_name.to_string(),
            item_description: item_description.to_string(),
            variant_code: variant_code.to_string(),
            color: color.to_string(),
            size: size.to_string(),
            stock_level,
            threshold,
            shortage: threshold - stock_level,
        })
    }

    /// 跨快照匹配键: (描述, 颜色, 尺码)
    pub fn variant_key(&self) -> (String, String, String) {
        (
            self.item_description.clone(),
            self.color.clone(),
            self.size.clone(),
        )
    }
}

// ==========================================
// ColorTotal - 按颜色汇总库存
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTotal {
    pub color: String,
    pub total_stock: u64,
}

// ==========================================
// ItemAlertSummary - 款式级汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAlertSummary {
    pub item_name: String,
    pub total_stock: u64,
    pub variants_count: usize,
    pub color_totals: Vec<ColorTotal>,
    pub alerts: Vec<AlertRecord>,
}

impl ItemAlertSummary {
    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }
}

/// 款名 → 汇总
pub type AlertReport = BTreeMap<String, ItemAlertSummary>;

// ==========================================
// AlertFeedEntry - 对外预警输出（邮件/报表协作方使用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFeedEntry {
    pub item_name: String,
    pub item_description: String,
    pub variant_code: String,
    pub color: String,
    pub size: String,
    pub stock_level: u32,
    pub required_threshold: u32,
    pub shortage: u32,
    pub status: String,
}

impl From<&AlertRecord> for AlertFeedEntry {
    fn from(alert: &AlertRecord) -> Self {
        Self {
            item_name: alert.item_name.clone(),
            item_description: alert.item_description.clone(),
            variant_code: alert.variant_code.clone(),
            color: alert.color.clone(),
            size: alert.size.clone(),
            stock_level: alert.stock_level,
            required_threshold: alert.threshold,
            shortage: alert.shortage,
            status: STATUS_LOW_STOCK.to_string(),
        }
    }
}

// ==========================================
// ItemOptions - 单款可选颜色/尺码（阈值管理界面使用）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOptions {
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub color_to_sizes: BTreeMap<String, Vec<String>>,
    pub size_to_colors: BTreeMap<String, Vec<String>>,
}

// ==========================================
// 阈值变动分析（上一期 vs 本期）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorsenedAlert {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub previous_stock: u32,
    pub stock_decrease: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdChangeSummary {
    pub total_current_low_stock: usize,
    pub total_previous_low_stock: usize,
    pub new_below_threshold: usize,
    pub improved_items: usize,
    pub worsened_items: usize,
    pub net_change: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdChangeReport {
    pub current_file: String,
    /// 无上一期文件时为 None（首次基线）
    pub previous_file: Option<String>,
    pub summary: ThresholdChangeSummary,
    pub new_below_threshold_items: Vec<AlertRecord>,
    pub improved_items: Vec<AlertRecord>,
    pub worsened_items: Vec<WorsenedAlert>,
    pub current_low_stock: Vec<AlertRecord>,
    pub summary_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_only_strictly_below_threshold() {
        let alert = AlertRecord::below_threshold("ANDRA", "ANDRA - JACKET", "990.XS", "Black", "XS", 7, 30)
            .unwrap();
        assert_eq!(alert.shortage, 23);

        assert!(AlertRecord::below_threshold("ANDRA", "ANDRA - JACKET", "990.XS", "Black", "XS", 30, 30).is_none());
        assert!(AlertRecord::below_threshold("ANDRA", "ANDRA - JACKET", "990.XS", "Black", "XS", 35, 30).is_none());
    }

    #[test]
    fn test_feed_entry_status() {
        let alert = AlertRecord::below_threshold("A", "A - X", "1.S", "Red", "S", 0, 1).unwrap();
        let entry = AlertFeedEntry::from(&alert);
        assert_eq!(entry.status, "LOW STOCK");
        assert_eq!(entry.required_threshold, 1);
        assert_eq!(entry.shortage, 1);
    }
}
