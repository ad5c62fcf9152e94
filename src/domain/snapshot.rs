// ==========================================
// 重点款库存监控 - 库存快照领域模型
// ==========================================
// 职责: 定义库存快照、款式变体记录、解析告警
// 红线: 快照加载后不可变，新文件产生新快照
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 无法识别尺码时的占位值
pub const UNKNOWN_SIZE: &str = "Unknown";

// ==========================================
// SnapshotSignature - 快照签名
// ==========================================
/// (文件路径, 修改时间) 二元组，用于判断缓存是否新鲜
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotSignature {
    pub file_path: PathBuf,
    pub modified: SystemTime,
}

impl SnapshotSignature {
    /// 读取文件当前签名
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self {
            file_path: path.to_path_buf(),
            modified,
        })
    }

    /// 修改时间（UTC）
    pub fn modified_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.modified)
    }

    /// 文件名（不含目录）
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_path.display().to_string())
    }
}

// ==========================================
// VariantRecord - 款式变体记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// 款名（由描述派生）
    pub item_name: String,
    /// 原始描述
    pub item_description: String,
    pub color: String,
    /// 原始变体编码
    pub variant_code: String,
    /// 规范尺码或 "Unknown"
    pub size: String,
    /// 库存数量（非负）
    pub quantity: u32,
    pub season_code: String,
    /// 源文件行号（1 起，含表头偏移）
    pub row_number: usize,
}

impl VariantRecord {
    /// 对比连接键: item_description || color || size
    pub fn join_key(&self) -> (String, String, String) {
        (
            self.item_description.clone(),
            self.color.clone(),
            self.size.clone(),
        )
    }

    pub fn is_tracked(&self, tracked_season_code: &str) -> bool {
        self.season_code == tracked_season_code
    }
}

// ==========================================
// ParseWarning - 解析告警（非致命）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub row_number: usize,
    pub variant_code: String,
    pub message: String,
}

// ==========================================
// InventorySnapshot - 库存快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub signature: SnapshotSignature,
    /// 命中的工作表
    pub sheet_name: String,
    /// 命中的表头行（0 起）
    pub header_row: usize,
    pub records: Vec<VariantRecord>,
    pub warnings: Vec<ParseWarning>,
}

impl InventorySnapshot {
    /// 重点款记录（季节码等于跟踪标记）
    pub fn tracked_records<'a>(
        &'a self,
        tracked_season_code: &'a str,
    ) -> impl Iterator<Item = &'a VariantRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.is_tracked(tracked_season_code))
    }

    /// 重点款款名（去重、排序）
    pub fn key_item_names(&self, tracked_season_code: &str) -> Vec<String> {
        self.tracked_records(tracked_season_code)
            .filter(|r| !r.item_name.is_empty())
            .map(|r| r.item_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.records.len()
    }
}

// ==========================================
// UploadedFileInfo - 存储目录中的库存文件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFileInfo {
    pub filename: String,
    pub file_path: PathBuf,
    pub modified_at: DateTime<Utc>,
    pub size_bytes: u64,
}
