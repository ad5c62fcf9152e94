// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、库存文件生成等功能
// ==========================================

#![allow(dead_code)]

use inventory_monitor::app::AppState;
use inventory_monitor::config::MonitorConfig;
use rusqlite::Connection;
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::{NamedTempFile, TempDir};

/// 库存导出的表头（与实际导出一致）
pub const HEADERS: [&str; 5] = [
    "Item Description",
    "Variant Color",
    "Variant Code",
    "Grand Total",
    "Season Code",
];

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = Connection::open(&db_path)?;
    inventory_monitor::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 一行库存记录
#[derive(Debug, Clone)]
pub struct InventoryRow {
    pub description: String,
    pub color: String,
    pub variant_code: String,
    pub quantity: String,
    pub season_code: String,
}

pub fn row(description: &str, color: &str, variant_code: &str, quantity: u32, season_code: &str) -> InventoryRow {
    InventoryRow {
        description: description.to_string(),
        color: color.to_string(),
        variant_code: variant_code.to_string(),
        quantity: quantity.to_string(),
        season_code: season_code.to_string(),
    }
}

/// 写入库存 CSV 文件
pub fn write_inventory_csv(path: &Path, rows: &[InventoryRow]) -> Result<PathBuf, Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADERS)?;
    for r in rows {
        writer.write_record([
            r.description.as_str(),
            r.color.as_str(),
            r.variant_code.as_str(),
            r.quantity.as_str(),
            r.season_code.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(path.to_path_buf())
}

/// 设置文件修改时间（秒，UNIX 纪元起）
pub fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}

/// 测试用应用状态: 临时数据库 + 临时上传目录
pub struct TestEnv {
    pub db_file: NamedTempFile,
    pub upload_dir: TempDir,
    pub state: AppState,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        let (db_file, db_path) = create_test_db().unwrap();
        let upload_dir = TempDir::new().unwrap();
        let config = MonitorConfig {
            upload_dir: upload_dir.path().to_path_buf(),
            ..config
        };
        let state = AppState::with_config(db_path, config).unwrap();
        Self {
            db_file,
            upload_dir,
            state,
        }
    }

    pub fn db_path(&self) -> String {
        self.db_file.path().to_string_lossy().to_string()
    }

    /// 将某文件的上传登记时间改为若干天前
    pub fn age_registration(&self, filename: &str, days: i64) {
        let uploaded_at = (chrono::Utc::now() - chrono::Duration::days(days))
            .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);
        let conn = Connection::open(self.db_path()).unwrap();
        conn.execute(
            "UPDATE uploaded_files SET uploaded_at = ?1 WHERE filename = ?2",
            rusqlite::params![uploaded_at, filename],
        )
        .unwrap();
    }

    /// 在上传目录中写入库存文件并设置修改时间
    pub fn upload(&self, name: &str, rows: &[InventoryRow], mtime_secs: u64) -> PathBuf {
        let path = write_inventory_csv(&self.upload_dir.path().join(name), rows).unwrap();
        set_mtime(&path, mtime_secs);
        path
    }
}

/// ANDRA 预警场景
pub fn andra_rows() -> Vec<InventoryRow> {
    vec![
        row("ANDRA - LEATHER JACKET", "Black", "990.XS", 7, "KI00"),
        row("ANDRA - LEATHER JACKET", "Black", "990.M", 35, "KI00"),
        row("ANDRA - LEATHER JACKET", "Red", "990.2XL", 3, "KI00"),
        row("OLIVE - KNIT", "Blue", "350S", 1, "FW24"),
    ]
}
