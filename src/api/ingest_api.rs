// ==========================================
// 重点款库存监控 - 上传接入 API
// ==========================================
// 上传协作方在新文件成为"最新"时调用:
// register_upload → 登记最新文件指针 + 清空缓存
// 另提供 invalidate_all / invalidate_for 两个缓存控制钩子
// cleanup_old_files: 按保留天数清理非激活的上传登记与文件
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::snapshot::UploadedFileInfo;
use crate::engine::cache::{CacheStats, SnapshotCache};
use crate::engine::latest_file::{FileCleanupReport, LatestFileResolver, DEFAULT_FILE_RETENTION_DAYS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRegistration {
    pub file_path: PathBuf,
    /// 数据库中的文件 ID（未配置持久化时为 None）
    pub file_id: Option<String>,
    pub invalidated_cache_entries: usize,
}

pub struct IngestApi {
    cache: Arc<SnapshotCache>,
    latest: Arc<LatestFileResolver>,
    retention_days: u32,
}

impl IngestApi {
    pub fn new(cache: Arc<SnapshotCache>, latest: Arc<LatestFileResolver>) -> Self {
        Self {
            cache,
            latest,
            retention_days: DEFAULT_FILE_RETENTION_DAYS,
        }
    }

    pub fn with_retention_days(mut self, retention_days: u32) -> Self {
        self.retention_days = retention_days;
        self
    }

    /// 新文件成为最新
    pub fn register_upload(&self, file_path: &Path) -> ApiResult<UploadRegistration> {
        if !file_path.is_file() {
            return Err(ApiError::LoadError(format!("文件不存在: {}", file_path.display())));
        }

        let entity = self.latest.register(file_path)?;
        let invalidated = self.cache.clear_all();

        tracing::info!(
            file = %file_path.display(),
            invalidated,
            "新文件已登记为最新"
        );

        Ok(UploadRegistration {
            file_path: file_path.to_path_buf(),
            file_id: entity.map(|e| e.file_id),
            invalidated_cache_entries: invalidated,
        })
    }

    pub fn invalidate_all(&self) -> usize {
        self.cache.clear_all()
    }

    pub fn invalidate_for(&self, item_name: &str) -> usize {
        self.cache.invalidate_for(item_name)
    }

    /// 当前最新文件（必要时自愈）
    pub fn latest_file(&self) -> ApiResult<PathBuf> {
        self.latest
            .resolve_latest_file()
            .ok_or_else(|| ApiError::NoInventoryFile(self.latest.storage_dir().display().to_string()))
    }

    /// 存储目录文件列表（最新在前）
    pub fn list_files(&self) -> Vec<UploadedFileInfo> {
        self.latest.list_files()
    }

    /// 清理过期的非激活上传（未指定天数时使用配置的保留期）
    pub fn cleanup_old_files(&self, keep_days: Option<u32>) -> ApiResult<FileCleanupReport> {
        let report = self.latest.cleanup(keep_days.unwrap_or(self.retention_days))?;
        Ok(report)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
