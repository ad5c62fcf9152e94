// ==========================================
// 重点款库存监控 - 表头/列识别
// ==========================================
// 阶段 1: 找到正确的工作表和表头行，将列名映射到五个逻辑列
// 规则:
// - 工作表顺序: Sheet1 / Inventory / Data 优先，其余按原顺序
// - 表头行依次尝试 0, 1, 2（兼容首行为元数据或重复表头的旧导出）
// - 列匹配: 先精确匹配，再做大小写不敏感的包含匹配
// - 首个五列齐全的 (工作表, 表头行) 组合胜出
// ==========================================

use crate::domain::types::LogicalColumn;
use crate::importer::error::SchemaError;
use crate::importer::file_parser::{RawSheet, RawWorkbook};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// 优先探测的工作表
pub const PRIORITY_SHEETS: [&str; 3] = ["Sheet1", "Inventory", "Data"];

/// 候选表头行（0 起）
pub const HEADER_ROW_CANDIDATES: [usize; 3] = [0, 1, 2];

// ==========================================
// NormalizedRow / NormalizedTable
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// 源文件行号（1 起）
    pub row_number: usize,
    cells: BTreeMap<LogicalColumn, String>,
}

impl NormalizedRow {
    pub fn get(&self, column: LogicalColumn) -> &str {
        self.cells.get(&column).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    pub sheet_name: String,
    pub header_row: usize,
    /// 逻辑列 → 源文件列名
    pub source_columns: BTreeMap<LogicalColumn, String>,
    pub rows: Vec<NormalizedRow>,
}

// ==========================================
// SchemaResolver
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaResolver;

impl SchemaResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析工作簿
    ///
    /// # 返回
    /// - Ok(NormalizedTable): 首个五列齐全的组合
    /// - Err(SchemaError): 列出始终无法匹配的逻辑列
    pub fn resolve(&self, workbook: &RawWorkbook) -> Result<NormalizedTable, SchemaError> {
        let ordered = Self::sheet_priority(&workbook.sheet_names());

        let mut ever_matched: BTreeSet<LogicalColumn> = BTreeSet::new();
        let mut best_attempt: Option<BTreeMap<LogicalColumn, usize>> = None;

        for sheet_name in &ordered {
            let Some(sheet) = workbook.sheet(sheet_name) else {
                continue;
            };

            for header_row in HEADER_ROW_CANDIDATES {
                let Some(headers) = sheet.rows.get(header_row) else {
                    break;
                };

                let mapping = Self::match_columns(headers);
                tracing::debug!(
                    file = %workbook.source,
                    sheet = %sheet_name,
                    header_row,
                    matched = mapping.len(),
                    "表头探测"
                );

                if mapping.len() == LogicalColumn::ALL.len() {
                    tracing::info!(
                        file = %workbook.source,
                        sheet = %sheet_name,
                        header_row,
                        "表头识别成功"
                    );
                    return Ok(Self::build_table(sheet, header_row, headers, &mapping));
                }

                ever_matched.extend(mapping.keys().copied());
                let better = best_attempt
                    .as_ref()
                    .map(|best| mapping.len() > best.len())
                    .unwrap_or(true);
                if better {
                    best_attempt = Some(mapping);
                }
            }
        }

        let mut missing: Vec<LogicalColumn> = LogicalColumn::ALL
            .iter()
            .copied()
            .filter(|c| !ever_matched.contains(c))
            .collect();

        // 每列都在某处匹配过，但从未同时齐全: 报告最佳尝试缺失的列
        if missing.is_empty() {
            let best = best_attempt.unwrap_or_default();
            missing = LogicalColumn::ALL
                .iter()
                .copied()
                .filter(|c| !best.contains_key(c))
                .collect();
        }

        tracing::warn!(
            file = %workbook.source,
            missing = ?missing,
            "未找到满足必需列的工作表/表头组合"
        );

        Err(SchemaError {
            file: workbook.source.clone(),
            missing_columns: missing,
            sheets_tried: ordered,
        })
    }

    /// 工作表探测顺序
    pub fn sheet_priority(sheet_names: &[&str]) -> Vec<String> {
        let mut ordered: Vec<String> = PRIORITY_SHEETS
            .iter()
            .filter(|p| sheet_names.contains(p))
            .map(|p| p.to_string())
            .collect();

        for name in sheet_names {
            if !ordered.iter().any(|o| o == name) {
                ordered.push(name.to_string());
            }
        }
        ordered
    }

    /// 在一行表头中匹配逻辑列（可能不完整）
    ///
    /// 同一源列不会被两个逻辑列占用；精确匹配优先于包含匹配
    pub fn match_columns(headers: &[String]) -> BTreeMap<LogicalColumn, usize> {
        let mut mapping = BTreeMap::new();
        let mut claimed: HashSet<usize> = HashSet::new();

        // 第一轮: 精确匹配
        for column in LogicalColumn::ALL {
            let found = column.match_candidates().find_map(|name| {
                headers
                    .iter()
                    .position(|h| !h.is_empty() && h.trim() == name)
            });
            if let Some(idx) = found {
                if claimed.insert(idx) {
                    mapping.insert(column, idx);
                }
            }
        }

        // 第二轮: 大小写不敏感的包含匹配
        for column in LogicalColumn::ALL {
            if mapping.contains_key(&column) {
                continue;
            }
            let found = column.match_candidates().find_map(|name| {
                let needle = name.to_lowercase();
                headers.iter().enumerate().position(|(idx, h)| {
                    !claimed.contains(&idx) && !h.is_empty() && h.to_lowercase().contains(&needle)
                })
            });
            if let Some(idx) = found {
                claimed.insert(idx);
                mapping.insert(column, idx);
            }
        }

        mapping
    }

    fn build_table(
        sheet: &RawSheet,
        header_row: usize,
        headers: &[String],
        mapping: &BTreeMap<LogicalColumn, usize>,
    ) -> NormalizedTable {
        let source_columns = mapping
            .iter()
            .map(|(column, idx)| (*column, headers[*idx].clone()))
            .collect();

        let rows = sheet
            .rows
            .iter()
            .enumerate()
            .skip(header_row + 1)
            .filter_map(|(idx, raw)| {
                let cells: BTreeMap<LogicalColumn, String> = mapping
                    .iter()
                    .map(|(column, col_idx)| {
                        (*column, raw.get(*col_idx).cloned().unwrap_or_default())
                    })
                    .collect();

                // 跳过完全空白的行
                if cells.values().all(|v| v.is_empty()) {
                    return None;
                }

                Some(NormalizedRow {
                    row_number: idx + 1,
                    cells,
                })
            })
            .collect();

        NormalizedTable {
            sheet_name: sheet.name.clone(),
            header_row,
            source_columns,
            rows,
        }
    }
}
