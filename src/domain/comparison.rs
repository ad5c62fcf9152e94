// ==========================================
// 重点款库存监控 - 期间对比领域模型
// ==========================================
// 职责: 两期快照连接结果、分类输出、对比报告
// ==========================================

use crate::domain::snapshot::VariantRecord;
use crate::domain::types::{Category, PerformanceLabel, Severity};
use serde::{Deserialize, Serialize};

// ==========================================
// ComparisonRecord - 两期连接行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub item_name: String,
    pub item_description: String,
    pub color: String,
    pub size: String,
    /// 上期记录（仅出现在本期时为 None）
    pub old: Option<VariantRecord>,
    /// 本期记录（仅出现在上期时为 None）
    pub new: Option<VariantRecord>,
    pub old_stock: i64,
    pub new_stock: i64,
    /// new_stock - old_stock
    pub change: i64,
    pub percentage_change: f64,
    /// 不满足任何规则（两期均为 0）时为 None
    pub category: Option<Category>,
    /// 仅 EXCELLENT 有值
    pub severity: Option<Severity>,
}

// ==========================================
// PerformanceEntry - 对外输出行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub item_name: String,
    pub color: String,
    pub size: String,
    pub old_stock: i64,
    pub new_stock: i64,
    pub change: i64,
    /// 保留一位小数
    pub percentage_change: f64,
    pub category: PerformanceLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub business_insight: String,
}

// ==========================================
// ComparisonSummary - 分类计数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total_items_analyzed: usize,
    pub excellent_performers: usize,
    pub poor_performers: usize,
    pub urgent_restock_needed: usize,
    pub new_products: usize,
    pub discontinued_products: usize,
    /// 不属于任何分类的行
    pub uncategorized: usize,
}

impl ComparisonSummary {
    pub fn count_for(&self, category: Category) -> usize {
        match category {
            Category::Urgent => self.urgent_restock_needed,
            Category::Excellent => self.excellent_performers,
            Category::Poor => self.poor_performers,
            Category::New => self.new_products,
            Category::Discontinued => self.discontinued_products,
        }
    }

    pub fn categorized_total(&self) -> usize {
        Category::ALL.iter().map(|c| self.count_for(*c)).sum()
    }
}

// ==========================================
// ComparisonReport - 对比分析报告（业务洞察）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub summary: ComparisonSummary,
    pub excellent_performers: Vec<PerformanceEntry>,
    pub poor_performers: Vec<PerformanceEntry>,
    pub urgent_restock: Vec<PerformanceEntry>,
    pub new_products: Vec<PerformanceEntry>,
    pub discontinued_products: Vec<PerformanceEntry>,
    pub top_sales: Vec<PerformanceEntry>,
    pub worst_performers: Vec<PerformanceEntry>,
    pub recommendations: Vec<String>,
}

// ==========================================
// ComparisonFeed - 对外输出（仪表盘/报表协作方）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonFeed {
    pub file1: String,
    pub file2: String,
    /// YYYY-MM-DD HH:MM
    pub analysis_date: String,
    pub total_items_analyzed: usize,
    pub business_insights: ComparisonReport,
}
