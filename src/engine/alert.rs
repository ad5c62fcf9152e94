// ==========================================
// 重点款库存监控 - 低库存预警引擎
// ==========================================
// 输入: 单期快照 + 重点款清单 + 阈值解析器
// 输出: 款名 → { 总库存, 按颜色汇总, 预警列表 }
// 规则:
// - 只有季节码等于跟踪标记的记录参与（其余记录完全排除）
// - 每条记录按 (款名, 尺码, 颜色) 解析阈值，库存 < 阈值 时预警
// - 单款查询的款名大小写不敏感，输出沿用文件中的写法
// 红线: 引擎不访问数据库、不读文件
// ==========================================

use crate::domain::alert::{AlertFeedEntry, AlertRecord, AlertReport, ColorTotal, ItemAlertSummary, ItemOptions};
use crate::domain::snapshot::{InventorySnapshot, VariantRecord};
use crate::engine::threshold_registry::ThresholdResolver;
use std::collections::{BTreeMap, BTreeSet};

/// 默认跟踪季节码
pub const DEFAULT_TRACKED_SEASON_CODE: &str = "KI00";

pub struct AlertEngine {
    tracked_season_code: String,
}

impl AlertEngine {
    pub fn new(tracked_season_code: &str) -> Self {
        Self {
            tracked_season_code: tracked_season_code.to_string(),
        }
    }

    pub fn tracked_season_code(&self) -> &str {
        &self.tracked_season_code
    }

    /// 重点款款名（去重、排序）
    pub fn detect_key_items(&self, snapshot: &InventorySnapshot) -> Vec<String> {
        snapshot.key_item_names(&self.tracked_season_code)
    }

    fn item_records<'a>(
        &'a self,
        snapshot: &'a InventorySnapshot,
        item_name: &str,
    ) -> impl Iterator<Item = &'a VariantRecord> + 'a {
        let wanted = item_name.trim().to_uppercase();
        snapshot
            .tracked_records(&self.tracked_season_code)
            .filter(move |r| r.item_name.to_uppercase() == wanted)
    }

    /// 批量计算预警
    pub fn compute_alerts(
        &self,
        snapshot: &InventorySnapshot,
        key_items: &[String],
        thresholds: &dyn ThresholdResolver,
    ) -> AlertReport {
        let mut report = AlertReport::new();
        for item_name in key_items {
            if let Some(summary) = self.item_alerts(snapshot, item_name, thresholds) {
                report.insert(item_name.clone(), summary);
            }
        }

        tracing::debug!(
            file = %snapshot.signature.file_path.display(),
            items = report.len(),
            alerts = report.values().map(|s| s.alert_count()).sum::<usize>(),
            "预警计算完成"
        );
        report
    }

    /// 单款预警；快照中无该款重点记录时返回 None
    pub fn item_alerts(
        &self,
        snapshot: &InventorySnapshot,
        item_name: &str,
        thresholds: &dyn ThresholdResolver,
    ) -> Option<ItemAlertSummary> {
        let mut total_stock: u64 = 0;
        let mut variants_count = 0usize;
        let mut by_color: BTreeMap<String, u64> = BTreeMap::new();
        let mut alerts = Vec::new();
        let mut display_name: Option<&str> = None;

        for record in self.item_records(snapshot, item_name) {
            let item_name = *display_name.get_or_insert(record.item_name.as_str());
            variants_count += 1;
            total_stock += u64::from(record.quantity);
            *by_color.entry(record.color.clone()).or_default() += u64::from(record.quantity);

            let threshold = thresholds.resolve(item_name, &record.size, &record.color);
            if let Some(alert) = AlertRecord::below_threshold(
                item_name,
                &record.item_description,
                &record.variant_code,
                &record.color,
                &record.size,
                record.quantity,
                threshold,
            ) {
                alerts.push(alert);
            }
        }

        let item_name = display_name?;

        Some(ItemAlertSummary {
            item_name: item_name.to_string(),
            total_stock,
            variants_count,
            color_totals: by_color
                .into_iter()
                .map(|(color, total_stock)| ColorTotal { color, total_stock })
                .collect(),
            alerts,
        })
    }

    /// 展平为对外预警输出
    pub fn alert_feed(report: &AlertReport) -> Vec<AlertFeedEntry> {
        report
            .values()
            .flat_map(|summary| summary.alerts.iter().map(AlertFeedEntry::from))
            .collect()
    }

    /// 按款名/描述/变体编码/颜色做大小写不敏感的包含搜索
    pub fn search(report: &AlertReport, term: &str) -> Vec<AlertFeedEntry> {
        let needle = term.trim().to_lowercase();
        report
            .values()
            .flat_map(|summary| summary.alerts.iter())
            .filter(|a| {
                [&a.item_name, &a.item_description, &a.variant_code, &a.color]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .map(AlertFeedEntry::from)
            .collect()
    }

    /// 单款可选颜色/尺码
    pub fn item_options(&self, snapshot: &InventorySnapshot, item_name: &str) -> ItemOptions {
        let mut color_to_sizes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut size_to_colors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for record in self.item_records(snapshot, item_name) {
            color_to_sizes
                .entry(record.color.clone())
                .or_default()
                .insert(record.size.clone());
            size_to_colors
                .entry(record.size.clone())
                .or_default()
                .insert(record.color.clone());
        }

        ItemOptions {
            colors: color_to_sizes.keys().cloned().collect(),
            sizes: size_to_colors.keys().cloned().collect(),
            color_to_sizes: color_to_sizes
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
            size_to_colors: size_to_colors
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
        }
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKED_SEASON_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::SnapshotSignature;
    use crate::engine::threshold_registry::FixedThreshold;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn record(desc: &str, color: &str, code: &str, size: &str, qty: u32, season: &str) -> VariantRecord {
        VariantRecord {
            item_name: desc.split(" - ").next().unwrap().trim().to_string(),
            item_description: desc.to_string(),
            color: color.to_string(),
            variant_code: code.to_string(),
            size: size.to_string(),
            quantity: qty,
            season_code: season.to_string(),
            row_number: 2,
        }
    }

    fn snapshot(records: Vec<VariantRecord>) -> InventorySnapshot {
        InventorySnapshot {
            signature: SnapshotSignature {
                file_path: PathBuf::from("inventory.xlsx"),
                modified: SystemTime::UNIX_EPOCH,
            },
            sheet_name: "Sheet1".to_string(),
            header_row: 0,
            records,
            warnings: vec![],
        }
    }

    fn fixture() -> InventorySnapshot {
        snapshot(vec![
            record("ANDRA - LEATHER JACKET", "Black", "990.XS", "XS", 7, "KI00"),
            record("ANDRA - LEATHER JACKET", "Black", "990.M", "M", 35, "KI00"),
            record("ANDRA - LEATHER JACKET", "Red", "990.M", "M", 3, "KI00"),
            record("OLIVE - KNIT", "Blue", "350S", "S", 1, "FW24"),
        ])
    }

    #[test]
    fn test_alert_scenario() {
        let engine = AlertEngine::default();
        let snap = fixture();
        let key_items = engine.detect_key_items(&snap);
        assert_eq!(key_items, vec!["ANDRA"]);

        let report = engine.compute_alerts(&snap, &key_items, &FixedThreshold(30));
        let andra = &report["ANDRA"];

        assert_eq!(andra.total_stock, 45);
        assert_eq!(andra.variants_count, 3);
        assert_eq!(
            andra.color_totals,
            vec![
                ColorTotal { color: "Black".into(), total_stock: 42 },
                ColorTotal { color: "Red".into(), total_stock: 3 },
            ]
        );
        assert_eq!(andra.alerts.len(), 2);
        assert_eq!(andra.alerts[0].shortage, 23);
        // 35 >= 30，不预警
        assert!(andra.alerts.iter().all(|a| a.stock_level < 30));
    }

    #[test]
    fn test_untracked_items_excluded() {
        let engine = AlertEngine::default();
        let report = engine.compute_alerts(&fixture(), &["OLIVE".to_string()], &FixedThreshold(30));
        assert!(report.is_empty());
    }

    #[test]
    fn test_search_and_feed() {
        let engine = AlertEngine::default();
        let snap = fixture();
        let report = engine.compute_alerts(&snap, &engine.detect_key_items(&snap), &FixedThreshold(30));

        assert_eq!(AlertEngine::alert_feed(&report).len(), 2);
        let hits = AlertEngine::search(&report, "red");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].status, "LOW STOCK");
        assert!(AlertEngine::search(&report, "zzz").is_empty());
    }

    #[test]
    fn test_item_options() {
        let engine = AlertEngine::default();
        let options = engine.item_options(&fixture(), "ANDRA");

        assert_eq!(options.colors, vec!["Black", "Red"]);
        assert_eq!(options.sizes, vec!["M", "XS"]);
        assert_eq!(options.color_to_sizes["Black"], vec!["M", "XS"]);
        assert_eq!(options.size_to_colors["M"], vec!["Black", "Red"]);
        assert_eq!(engine.item_options(&fixture(), "NOPE"), ItemOptions::default());
    }

    #[test]
    fn test_item_lookup_ignores_case() {
        let engine = AlertEngine::default();
        let snap = fixture();

        let summary = engine.item_alerts(&snap, " andra ", &FixedThreshold(30)).unwrap();
        assert_eq!(summary.item_name, "ANDRA");
        assert_eq!(summary.total_stock, 45);
        assert_eq!(summary.alerts.len(), 2);

        assert_eq!(engine.item_options(&snap, "Andra").colors, vec!["Black", "Red"]);
        assert!(engine.item_alerts(&snap, "olive", &FixedThreshold(30)).is_none());
    }
}
