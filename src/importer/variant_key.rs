// ==========================================
// 重点款库存监控 - 款名/尺码提取
// ==========================================
// 阶段 2: 从描述和变体编码派生款名与规范尺码
// 款名: "DARIA - SLIM FIT" → "DARIA"
// 尺码: "990.3XS" → "3XS" / "9902XL" → "2XL" / "99026" → "26"
// ==========================================

use crate::domain::snapshot::UNKNOWN_SIZE;

/// 款名分隔符
pub const ITEM_NAME_DELIMITER: &str = " - ";

/// 规范尺码（长模式在前，避免 "2XL" 被识别为 "XL"）
pub const SIZE_PATTERNS: [&str; 10] = ["3XL", "2XL", "3XS", "2XS", "XL", "XS", "NS", "S", "M", "L"];

#[derive(Debug, Default, Clone, Copy)]
pub struct VariantKeyExtractor;

impl VariantKeyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 提取款名（分隔符前的第一段）
    pub fn item_name(&self, item_description: &str) -> String {
        item_description
            .split(ITEM_NAME_DELIMITER)
            .next()
            .unwrap_or("")
            .trim()
            .to_string()
    }

    /// 提取规范尺码，无法识别时返回 "Unknown"
    pub fn extract_size(&self, variant_code: &str) -> String {
        let code = variant_code.trim();
        if code.is_empty() {
            return UNKNOWN_SIZE.to_string();
        }

        // 点分格式: 取第一个点之后的片段
        if let Some(fragment) = code.split('.').nth(1) {
            let fragment = fragment.trim_end_matches('.');

            // 腰带尺码（纯数字）
            if !fragment.is_empty() && fragment.chars().all(|c| c.is_ascii_digit()) {
                return fragment.to_string();
            }

            if let Some(pattern) = SIZE_PATTERNS.iter().find(|p| **p == fragment) {
                return pattern.to_string();
            }
        }

        // 拼接格式: 按相同顺序做结尾匹配
        if let Some(pattern) = SIZE_PATTERNS.iter().find(|p| code.ends_with(*p)) {
            return pattern.to_string();
        }

        // 无分隔符的腰带尺码: 结尾两位数字
        let tail: Vec<char> = code.chars().rev().take(2).collect();
        if tail.len() == 2 && tail.iter().all(|c| c.is_ascii_digit()) {
            return tail.iter().rev().collect();
        }

        UNKNOWN_SIZE.to_string()
    }

    pub fn is_unknown(size: &str) -> bool {
        size == UNKNOWN_SIZE
    }
}
