// ==========================================
// 重点款库存监控 - 期间对比引擎
// ==========================================
// 输入: 上期快照 + 本期快照（仅跟踪季节码的记录）
// 连接键: 描述 || 颜色 || 尺码（外连接，缺失一侧库存记 0）
// 分类（互斥，按序判定）:
// 1. URGENT       本期 0，上期 > 0
// 2. EXCELLENT    变动 < 0 且本期 > 0（强度分档不影响分类）
// 3. POOR         变动 = 0 且上期 > 0
// 4. NEW          上期 0，本期 > 0
// 5. DISCONTINUED 本期已无该变体，且上期库存为 0
// 其余（两期均为 0 且都在表中）不归入任何分类
// ==========================================

use crate::domain::comparison::{
    ComparisonFeed, ComparisonRecord, ComparisonReport, ComparisonSummary, PerformanceEntry,
};
use crate::domain::snapshot::{InventorySnapshot, VariantRecord};
use crate::domain::types::{Category, PerformanceLabel, Severity};
use crate::engine::alert::DEFAULT_TRACKED_SEASON_CODE;
use chrono::Local;
use std::collections::HashMap;

/// 排行榜默认条数
pub const DEFAULT_TOP_MOVERS_LIMIT: usize = 10;

type JoinKey = (String, String, String);

/// 同一快照内按连接键聚合（重复键数量累加）
struct Aggregated {
    record: VariantRecord,
    quantity: i64,
}

pub struct ComparisonEngine {
    top_movers_limit: usize,
    /// None 表示不按季节码过滤
    tracked_season_code: Option<String>,
}

impl ComparisonEngine {
    pub fn new(top_movers_limit: usize) -> Self {
        Self {
            top_movers_limit,
            tracked_season_code: Some(DEFAULT_TRACKED_SEASON_CODE.to_string()),
        }
    }

    pub fn with_tracked_season(mut self, tracked_season_code: Option<&str>) -> Self {
        self.tracked_season_code = tracked_season_code.map(str::to_string);
        self
    }

    fn is_included(&self, record: &VariantRecord) -> bool {
        match &self.tracked_season_code {
            Some(code) => record.is_tracked(code),
            None => true,
        }
    }

    fn aggregate(&self, snapshot: &InventorySnapshot) -> (Vec<JoinKey>, HashMap<JoinKey, Aggregated>) {
        let mut order = Vec::new();
        let mut by_key: HashMap<JoinKey, Aggregated> = HashMap::new();

        for record in snapshot.records.iter().filter(|r| self.is_included(r)) {
            let key = record.join_key();
            match by_key.get_mut(&key) {
                Some(agg) => {
                    tracing::warn!(
                        file = %snapshot.signature.file_path.display(),
                        description = %record.item_description,
                        color = %record.color,
                        size = %record.size,
                        row = record.row_number,
                        "连接键重复，数量累加"
                    );
                    agg.quantity += i64::from(record.quantity);
                }
                None => {
                    order.push(key.clone());
                    by_key.insert(
                        key,
                        Aggregated {
                            record: record.clone(),
                            quantity: i64::from(record.quantity),
                        },
                    );
                }
            }
        }

        (order, by_key)
    }

    /// 外连接两期快照（上期顺序在前，仅本期出现的行随后）
    pub fn compare(&self, old: &InventorySnapshot, new: &InventorySnapshot) -> Vec<ComparisonRecord> {
        let (old_order, mut old_map) = self.aggregate(old);
        let (new_order, mut new_map) = self.aggregate(new);

        let mut records = Vec::with_capacity(old_order.len().max(new_order.len()));
        for key in old_order {
            let old_side = old_map.remove(&key);
            let new_side = new_map.remove(&key);
            records.push(Self::joined(key, old_side, new_side));
        }
        for key in new_order {
            if let Some(new_side) = new_map.remove(&key) {
                records.push(Self::joined(key, None, Some(new_side)));
            }
        }

        tracing::debug!(
            old = %old.signature.file_path.display(),
            new = %new.signature.file_path.display(),
            rows = records.len(),
            "两期连接完成"
        );
        records
    }

    fn joined(key: JoinKey, old: Option<Aggregated>, new: Option<Aggregated>) -> ComparisonRecord {
        let old_stock = old.as_ref().map(|a| a.quantity).unwrap_or(0);
        let new_stock = new.as_ref().map(|a| a.quantity).unwrap_or(0);
        let change = new_stock - old_stock;
        let category = Self::classify(old_stock, new_stock, new.is_some());
        let severity = match category {
            Some(Category::Excellent) => Some(Severity::from_change(change)),
            _ => None,
        };

        let item_name = old
            .as_ref()
            .or(new.as_ref())
            .map(|a| a.record.item_name.clone())
            .unwrap_or_default();
        let (item_description, color, size) = key;

        ComparisonRecord {
            item_name,
            item_description,
            color,
            size,
            old: old.map(|a| a.record),
            new: new.map(|a| a.record),
            old_stock,
            new_stock,
            change,
            percentage_change: percentage_change(old_stock, new_stock),
            category,
            severity,
        }
    }

    /// 互斥分类
    pub fn classify(old_stock: i64, new_stock: i64, in_new_snapshot: bool) -> Option<Category> {
        let change = new_stock - old_stock;
        if new_stock == 0 && old_stock > 0 {
            Some(Category::Urgent)
        } else if change < 0 && new_stock > 0 {
            Some(Category::Excellent)
        } else if change == 0 && old_stock > 0 {
            Some(Category::Poor)
        } else if old_stock == 0 && new_stock > 0 {
            Some(Category::New)
        } else if new_stock == 0 && !in_new_snapshot {
            Some(Category::Discontinued)
        } else {
            None
        }
    }

    /// 生成分类列表、排行榜和建议
    pub fn analyze(&self, records: &[ComparisonRecord]) -> ComparisonReport {
        let mut report = ComparisonReport::default();

        for record in records {
            let Some(category) = record.category else {
                report.summary.uncategorized += 1;
                continue;
            };
            let entry = performance_entry(record, category.into());
            match category {
                Category::Urgent => report.urgent_restock.push(entry),
                Category::Excellent => report.excellent_performers.push(entry),
                Category::Poor => report.poor_performers.push(entry),
                Category::New => report.new_products.push(entry),
                Category::Discontinued => report.discontinued_products.push(entry),
            }
        }

        report.summary = ComparisonSummary {
            total_items_analyzed: records.len(),
            excellent_performers: report.excellent_performers.len(),
            poor_performers: report.poor_performers.len(),
            urgent_restock_needed: report.urgent_restock.len(),
            new_products: report.new_products.len(),
            discontinued_products: report.discontinued_products.len(),
            uncategorized: report.summary.uncategorized,
        };

        // 销量榜: 库存下降最多
        let mut sellers: Vec<&ComparisonRecord> = records.iter().filter(|r| r.change < 0).collect();
        sellers.sort_by(|a, b| b.change.unsigned_abs().cmp(&a.change.unsigned_abs()));
        report.top_sales = sellers
            .into_iter()
            .take(self.top_movers_limit)
            .map(|r| performance_entry(r, PerformanceLabel::TopSales))
            .collect();

        // 滞销榜: 上期有货且库存未下降，增加最多者在前
        let mut laggards: Vec<&ComparisonRecord> = records
            .iter()
            .filter(|r| r.old_stock > 0 && r.change >= 0)
            .collect();
        laggards.sort_by(|a, b| b.change.cmp(&a.change));
        report.worst_performers = laggards
            .into_iter()
            .take(self.top_movers_limit)
            .map(|r| performance_entry(r, PerformanceLabel::Worst))
            .collect();

        report.recommendations = recommendations(&report.summary);
        report
    }

    /// 对比 + 分析，生成对外输出
    pub fn feed(&self, old: &InventorySnapshot, new: &InventorySnapshot) -> ComparisonFeed {
        let records = self.compare(old, new);
        let report = self.analyze(&records);

        ComparisonFeed {
            file1: old.signature.file_name(),
            file2: new.signature.file_name(),
            analysis_date: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            total_items_analyzed: records.len(),
            business_insights: report,
        }
    }
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_MOVERS_LIMIT)
    }
}

/// 变动百分比；上期为 0 时本期有货记 100，否则 0
pub fn percentage_change(old_stock: i64, new_stock: i64) -> f64 {
    let change = (new_stock - old_stock) as f64;
    let pct = if old_stock > 0 {
        change / old_stock as f64 * 100.0
    } else if new_stock > 0 {
        100.0
    } else {
        0.0
    };

    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn performance_entry(record: &ComparisonRecord, label: PerformanceLabel) -> PerformanceEntry {
    PerformanceEntry {
        item_name: record.item_name.clone(),
        color: record.color.clone(),
        size: record.size.clone(),
        old_stock: record.old_stock,
        new_stock: record.new_stock,
        change: record.change,
        percentage_change: round_one_decimal(record.percentage_change),
        category: label,
        severity: record.severity,
        business_insight: business_insight(label, record.severity).to_string(),
    }
}

pub fn business_insight(label: PerformanceLabel, severity: Option<Severity>) -> &'static str {
    match (label, severity) {
        (PerformanceLabel::Excellent, Some(Severity::Exceptional)) => {
            "EXCEPTIONAL - Outstanding sales performance, urgent restock needed"
        }
        (PerformanceLabel::Excellent, Some(Severity::Strong)) => "EXCELLENT - Strong performer, restock soon",
        (PerformanceLabel::Excellent, _) => "GOOD - Solid sales performance, monitor stock levels",
        (PerformanceLabel::Poor, _) => "POOR - No sales movement, consider promotions or discontinuation",
        (PerformanceLabel::Urgent, _) => "CRITICAL - Completely sold out, immediate restock required",
        (PerformanceLabel::New, _) => "NEW - Recently introduced product",
        (PerformanceLabel::Discontinued, _) => "DISCONTINUED - Product removed from inventory",
        (PerformanceLabel::TopSales, _) => "TOP SELLER - Highest sales volume",
        (PerformanceLabel::Worst, _) => "WORST - Lowest performance, review strategy",
    }
}

pub fn recommendations(summary: &ComparisonSummary) -> Vec<String> {
    let mut out = Vec::new();

    if summary.urgent_restock_needed > 0 {
        out.push(format!(
            "URGENT: {} items are completely sold out - immediate restock required",
            summary.urgent_restock_needed
        ));
    }
    if summary.excellent_performers > 0 {
        out.push(format!(
            "ACTION: {} items are selling well (stock decreased) - increase production",
            summary.excellent_performers
        ));
    }
    if summary.poor_performers > 0 {
        out.push(format!(
            "REVIEW: {} items showing no sales movement (stock unchanged) - consider promotions or discontinuation",
            summary.poor_performers
        ));
    }
    if summary.new_products > 0 {
        out.push(format!(
            "MONITOR: {} new products introduced - track performance",
            summary.new_products
        ));
    }
    if summary.discontinued_products > 0 {
        out.push(format!(
            "CLEANUP: {} products discontinued - update marketing",
            summary.discontinued_products
        ));
    }

    let total = summary.categorized_total();
    if total > 0 {
        let excellent_rate = summary.excellent_performers as f64 / total as f64 * 100.0;
        if excellent_rate > 30.0 {
            out.push("EXCELLENT: Strong sales performance across product line".to_string());
        } else if excellent_rate < 10.0 {
            out.push("CONCERN: Low sales rate - review overall strategy".to_string());
        }
    }

    out
}
