// ==========================================
// 重点款库存监控 - 最新文件解析（自愈）
// ==========================================
// resolve_latest_file:
// 1. 数据库指针存在且文件仍在磁盘上 → 直接返回
// 2. 否则扫描存储目录，取修改时间最新的库存文件并重新登记
// 可重复执行: 第二次调用时指针已有效，结果不变
// previous_file: 以最新文件自身的修改时间为基准，取更早的一个
// cleanup: 删除过期的非激活登记及其不再被引用的存储目录内文件
// ==========================================

use crate::domain::snapshot::UploadedFileInfo;
use crate::repository::error::RepositoryResult;
use crate::repository::uploaded_file_repo::{LatestFilePointer, UploadedFileEntity};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 非活动上传文件默认保留天数
pub const DEFAULT_FILE_RETENTION_DAYS: u32 = 30;

/// 上传文件清理结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileCleanupReport {
    pub keep_days: u32,
    pub removed_registrations: usize,
    pub deleted_files: Vec<PathBuf>,
}

pub struct LatestFileResolver {
    storage_dir: PathBuf,
    /// 小写扩展名（不含点）
    extensions: Vec<String>,
    pointer: Option<Arc<dyn LatestFilePointer>>,
}

impl LatestFileResolver {
    pub fn new(
        storage_dir: impl Into<PathBuf>,
        extensions: &[String],
        pointer: Option<Arc<dyn LatestFilePointer>>,
    ) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            extensions: extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
            pointer,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// 当前最新文件（必要时自愈）
    pub fn resolve_latest_file(&self) -> Option<PathBuf> {
        if let Some(pointer) = &self.pointer {
            match pointer.active_file() {
                Ok(Some(active)) if active.file_path.is_file() => return Some(active.file_path),
                Ok(Some(active)) => {
                    tracing::warn!(file = %active.file_path.display(), "登记的最新文件已不存在，扫描存储目录");
                }
                Ok(None) => {
                    tracing::info!("无登记的最新文件，扫描存储目录");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "读取最新文件指针失败，扫描存储目录");
                }
            }
        }

        let newest = self.list_files().into_iter().next()?;

        if let Some(pointer) = &self.pointer {
            if let Err(e) = pointer.register_active(&newest.file_path, newest.size_bytes) {
                tracing::warn!(file = %newest.file_path.display(), error = %e, "最新文件重新登记失败");
            }
        }

        tracing::info!(file = %newest.file_path.display(), "自愈: 使用存储目录中最新的文件");
        Some(newest.file_path)
    }

    /// 上一期文件: 修改时间不晚于最新文件的文件中最新的一个
    ///
    /// 登记的最新文件可能比目录中其他文件更旧，此时更新的文件不参与
    pub fn previous_file(&self, latest: &Path) -> Option<PathBuf> {
        let files = self.list_files();

        if let Some(pos) = files.iter().position(|f| f.file_path == latest) {
            return files.into_iter().nth(pos + 1).map(|f| f.file_path);
        }

        // 最新文件不在存储目录中: 按其修改时间比较
        let latest_modified = std::fs::metadata(latest)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)?;
        files
            .into_iter()
            .find(|f| f.file_path != latest && f.modified_at <= latest_modified)
            .map(|f| f.file_path)
    }

    /// 清理超过保留期的非激活登记
    ///
    /// 仅删除存储目录内且不再被任何登记引用的文件；删除失败只记录告警
    pub fn cleanup(&self, keep_days: u32) -> RepositoryResult<FileCleanupReport> {
        let Some(pointer) = &self.pointer else {
            return Ok(FileCleanupReport {
                keep_days,
                ..FileCleanupReport::default()
            });
        };

        let cutoff = Utc::now() - Duration::days(i64::from(keep_days));
        let outcome = pointer.cleanup_inactive(cutoff)?;

        let mut deleted_files = Vec::new();
        for path in outcome.orphaned_paths {
            if !path.starts_with(&self.storage_dir) || !path.is_file() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => deleted_files.push(path),
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "过期文件删除失败"),
            }
        }

        tracing::info!(
            keep_days,
            removed = outcome.removed.len(),
            deleted = deleted_files.len(),
            "上传文件清理完成"
        );
        Ok(FileCleanupReport {
            keep_days,
            removed_registrations: outcome.removed.len(),
            deleted_files,
        })
    }

    /// 登记新上传文件为最新
    pub fn register(&self, file_path: &Path) -> RepositoryResult<Option<UploadedFileEntity>> {
        let Some(pointer) = &self.pointer else {
            return Ok(None);
        };
        let size = std::fs::metadata(file_path).map(|m| m.len()).unwrap_or(0);
        pointer.register_active(file_path, size).map(Some)
    }

    fn is_inventory_file(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        // Office 锁文件 / 隐藏文件
        if name.starts_with("~$") || name.starts_with('.') {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// 存储目录中的库存文件（最新在前）
    pub fn list_files(&self) -> Vec<UploadedFileInfo> {
        let entries = match std::fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.storage_dir.display(), error = %e, "存储目录不可读");
                return Vec::new();
            }
        };

        let mut files: Vec<UploadedFileInfo> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.is_inventory_file(path))
            .filter_map(|path| {
                let meta = std::fs::metadata(&path).ok()?;
                let modified = meta.modified().ok()?;
                Some(UploadedFileInfo {
                    filename: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    file_path: path,
                    modified_at: DateTime::<Utc>::from(modified),
                    size_bytes: meta.len(),
                })
            })
            .collect();

        files.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        files
    }
}
