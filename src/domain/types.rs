// ==========================================
// 重点款库存监控 - 领域类型定义
// ==========================================
// 职责: 逻辑列、对比分类、销售强度等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 逻辑列 (Logical Column)
// ==========================================
// 导出文件的列名会随版本变化，解析时统一映射到这五个逻辑列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalColumn {
    ItemDescription,
    VariantColor,
    VariantCode,
    Quantity,
    SeasonCode,
}

impl LogicalColumn {
    /// 全部必需列（按匹配顺序）
    pub const ALL: [LogicalColumn; 5] = [
        LogicalColumn::ItemDescription,
        LogicalColumn::VariantColor,
        LogicalColumn::VariantCode,
        LogicalColumn::Quantity,
        LogicalColumn::SeasonCode,
    ];

    /// 规范列名（归一化后表头使用）
    pub fn canonical_name(&self) -> &'static str {
        match self {
            LogicalColumn::ItemDescription => "ItemDescription",
            LogicalColumn::VariantColor => "VariantColor",
            LogicalColumn::VariantCode => "VariantCode",
            LogicalColumn::Quantity => "Quantity",
            LogicalColumn::SeasonCode => "SeasonCode",
        }
    }

    /// 源文件中的候选列名（首个为主名称）
    ///
    /// 数量列在导出中通常叫 "Grand Total"
    pub fn source_names(&self) -> &'static [&'static str] {
        match self {
            LogicalColumn::ItemDescription => &["Item Description"],
            LogicalColumn::VariantColor => &["Variant Color", "Variant Colour"],
            LogicalColumn::VariantCode => &["Variant Code"],
            LogicalColumn::Quantity => &["Grand Total", "Quantity"],
            LogicalColumn::SeasonCode => &["Season Code"],
        }
    }

    /// 匹配候选: 导出列名在前，规范列名兜底
    pub fn match_candidates(&self) -> impl Iterator<Item = &'static str> {
        let canonical = self.canonical_name();
        let sources = self.source_names();
        sources
            .iter()
            .copied()
            .chain((!sources.contains(&canonical)).then_some(canonical))
    }
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

// ==========================================
// 对比分类 (Comparison Category)
// ==========================================
// 互斥分类，判定顺序: URGENT → EXCELLENT → POOR → NEW → DISCONTINUED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Urgent,       // 刚刚售罄
    Excellent,    // 在售且库存下降
    Poor,         // 无变动
    New,          // 新品
    Discontinued, // 下架
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Urgent,
        Category::Excellent,
        Category::Poor,
        Category::New,
        Category::Discontinued,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Urgent => write!(f, "URGENT"),
            Category::Excellent => write!(f, "EXCELLENT"),
            Category::Poor => write!(f, "POOR"),
            Category::New => write!(f, "NEW"),
            Category::Discontinued => write!(f, "DISCONTINUED"),
        }
    }
}

// ==========================================
// 销售强度 (Sales Severity)
// ==========================================
// 仅对 EXCELLENT 细分，不影响分类本身
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Good,        // |change| <= 10
    Strong,      // |change| > 10
    Exceptional, // |change| > 20
}

impl Severity {
    /// 按变动幅度分档
    pub fn from_change(change: i64) -> Self {
        let magnitude = change.unsigned_abs();
        if magnitude > 20 {
            Severity::Exceptional
        } else if magnitude > 10 {
            Severity::Strong
        } else {
            Severity::Good
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Good => write!(f, "GOOD"),
            Severity::Strong => write!(f, "STRONG"),
            Severity::Exceptional => write!(f, "EXCEPTIONAL"),
        }
    }
}

// ==========================================
// 输出列表标签 (Performance Label)
// ==========================================
// 五个分类之外，还有 TOP_SALES / WORST 两个排行榜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceLabel {
    Excellent,
    Poor,
    Urgent,
    New,
    Discontinued,
    TopSales,
    Worst,
}

impl From<Category> for PerformanceLabel {
    fn from(category: Category) -> Self {
        match category {
            Category::Urgent => PerformanceLabel::Urgent,
            Category::Excellent => PerformanceLabel::Excellent,
            Category::Poor => PerformanceLabel::Poor,
            Category::New => PerformanceLabel::New,
            Category::Discontinued => PerformanceLabel::Discontinued,
        }
    }
}

impl fmt::Display for PerformanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceLabel::Excellent => write!(f, "EXCELLENT"),
            PerformanceLabel::Poor => write!(f, "POOR"),
            PerformanceLabel::Urgent => write!(f, "URGENT"),
            PerformanceLabel::New => write!(f, "NEW"),
            PerformanceLabel::Discontinued => write!(f, "DISCONTINUED"),
            PerformanceLabel::TopSales => write!(f, "TOP_SALES"),
            PerformanceLabel::Worst => write!(f, "WORST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_change(-1), Severity::Good);
        assert_eq!(Severity::from_change(-10), Severity::Good);
        assert_eq!(Severity::from_change(-11), Severity::Strong);
        assert_eq!(Severity::from_change(-21), Severity::Exceptional);
    }

    #[test]
    fn test_category_serde_format() {
        let json = serde_json::to_string(&Category::Discontinued).unwrap();
        assert_eq!(json, "\"DISCONTINUED\"");
        assert_eq!(Category::Urgent.to_string(), "URGENT");
    }

    #[test]
    fn test_quantity_source_names() {
        assert_eq!(LogicalColumn::Quantity.source_names()[0], "Grand Total");
        assert_eq!(LogicalColumn::ALL.len(), 5);
    }

    #[test]
    fn test_match_candidates_include_canonical_name() {
        let candidates: Vec<&str> = LogicalColumn::SeasonCode.match_candidates().collect();
        assert_eq!(candidates, vec!["Season Code", "SeasonCode"]);

        // 规范名已在导出名中时不重复
        let candidates: Vec<&str> = LogicalColumn::Quantity.match_candidates().collect();
        assert_eq!(candidates, vec!["Grand Total", "Quantity"]);
    }
}
