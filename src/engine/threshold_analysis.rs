// ==========================================
// 重点款库存监控 - 阈值变动分析
// ==========================================
// 比较两期预警列表（变体键 = 描述, 颜色, 尺码）:
// - 新跌破: 本期预警、上期未预警
// - 已恢复: 上期预警、本期未预警
// - 恶化:   两期均预警且本期库存更低
// 无上一期文件时仅输出本期基线
// ==========================================

use crate::domain::alert::{
    AlertRecord, AlertReport, ThresholdChangeReport, ThresholdChangeSummary, WorsenedAlert,
};
use std::collections::{HashMap, HashSet};

pub struct ThresholdChangeAnalyzer;

impl ThresholdChangeAnalyzer {
    /// 展平预警报告
    pub fn low_stock(report: &AlertReport) -> Vec<AlertRecord> {
        report
            .values()
            .flat_map(|s| s.alerts.iter().cloned())
            .collect()
    }

    pub fn analyze(
        current_file: &str,
        current: Vec<AlertRecord>,
        previous: Option<(&str, Vec<AlertRecord>)>,
    ) -> ThresholdChangeReport {
        let Some((previous_file, previous)) = previous else {
            let summary = ThresholdChangeSummary {
                total_current_low_stock: current.len(),
                ..Default::default()
            };
            let summary_text = format!(
                "Initial Analysis: {} items below threshold (baseline established)",
                current.len()
            );
            return ThresholdChangeReport {
                current_file: current_file.to_string(),
                previous_file: None,
                summary,
                new_below_threshold_items: vec![],
                improved_items: vec![],
                worsened_items: vec![],
                current_low_stock: current,
                summary_text,
            };
        };

        let current_keys: HashSet<_> = current.iter().map(AlertRecord::variant_key).collect();
        let previous_by_key: HashMap<_, &AlertRecord> =
            previous.iter().map(|a| (a.variant_key(), a)).collect();

        let new_below: Vec<AlertRecord> = current
            .iter()
            .filter(|a| !previous_by_key.contains_key(&a.variant_key()))
            .cloned()
            .collect();

        let improved: Vec<AlertRecord> = previous
            .iter()
            .filter(|a| !current_keys.contains(&a.variant_key()))
            .cloned()
            .collect();

        let worsened: Vec<WorsenedAlert> = current
            .iter()
            .filter_map(|a| {
                let before = previous_by_key.get(&a.variant_key())?;
                (a.stock_level < before.stock_level).then(|| WorsenedAlert {
                    alert: a.clone(),
                    previous_stock: before.stock_level,
                    stock_decrease: before.stock_level - a.stock_level,
                })
            })
            .collect();

        let summary = ThresholdChangeSummary {
            total_current_low_stock: current.len(),
            total_previous_low_stock: previous.len(),
            new_below_threshold: new_below.len(),
            improved_items: improved.len(),
            worsened_items: worsened.len(),
            net_change: current.len() as i64 - previous.len() as i64,
        };
        let summary_text = Self::summary_text(&summary);

        tracing::info!(
            current = current_file,
            previous = previous_file,
            new_below = summary.new_below_threshold,
            improved = summary.improved_items,
            worsened = summary.worsened_items,
            "阈值变动分析完成"
        );

        ThresholdChangeReport {
            current_file: current_file.to_string(),
            previous_file: Some(previous_file.to_string()),
            summary,
            new_below_threshold_items: new_below,
            improved_items: improved,
            worsened_items: worsened,
            current_low_stock: current,
            summary_text,
        }
    }

    /// 一行摘要
    pub fn summary_text(summary: &ThresholdChangeSummary) -> String {
        let mut parts = Vec::new();
        if summary.new_below_threshold > 0 {
            parts.push(format!("{} NEW items below threshold", summary.new_below_threshold));
        }
        if summary.improved_items > 0 {
            parts.push(format!("{} items improved (above threshold)", summary.improved_items));
        }
        if summary.worsened_items > 0 {
            parts.push(format!("{} items got worse", summary.worsened_items));
        }

        match summary.net_change {
            n if n > 0 => parts.push(format!("Net increase: +{} low stock items", n)),
            n if n < 0 => parts.push(format!("Net decrease: {} low stock items", n)),
            _ => parts.push("No net change in low stock items".to_string()),
        }

        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(desc: &str, size: &str, stock: u32) -> AlertRecord {
        AlertRecord::below_threshold("ANDRA", desc, "990.XS", "Black", size, stock, 30).unwrap()
    }

    #[test]
    fn test_change_buckets() {
        let previous = vec![alert("ANDRA - A", "XS", 10), alert("ANDRA - A", "S", 5)];
        let current = vec![alert("ANDRA - A", "XS", 4), alert("ANDRA - A", "M", 2)];

        let report = ThresholdChangeAnalyzer::analyze("new.xlsx", current, Some(("old.xlsx", previous)));

        assert_eq!(report.summary.new_below_threshold, 1);
        assert_eq!(report.new_below_threshold_items[0].size, "M");
        assert_eq!(report.summary.improved_items, 1);
        assert_eq!(report.improved_items[0].size, "S");
        assert_eq!(report.worsened_items.len(), 1);
        assert_eq!(report.worsened_items[0].stock_decrease, 6);
        assert_eq!(report.summary.net_change, 0);
        assert_eq!(
            report.summary_text,
            "1 NEW items below threshold | 1 items improved (above threshold) | 1 items got worse | No net change in low stock items"
        );
    }

    #[test]
    fn test_initial_baseline() {
        let report = ThresholdChangeAnalyzer::analyze("new.xlsx", vec![alert("ANDRA - A", "XS", 1)], None);
        assert!(report.previous_file.is_none());
        assert_eq!(report.summary.total_current_low_stock, 1);
        assert!(report.summary_text.starts_with("Initial Analysis: 1 items"));
    }
}
