// ==========================================
// 重点款库存监控 - 快照读取（带缓存）
// ==========================================
// 各 API 共用: 文件 → 不可变快照，按 (路径, mtime) 缓存
// 最新文件统一经 LatestFileResolver 解析
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::snapshot::InventorySnapshot;
use crate::engine::cache::{CacheDeps, SnapshotCache};
use crate::engine::latest_file::LatestFileResolver;
use crate::importer::importer_trait::SnapshotSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const OP_SNAPSHOT: &str = "snapshot";

pub struct SnapshotAccess {
    source: Arc<dyn SnapshotSource>,
    cache: Arc<SnapshotCache>,
    latest: Arc<LatestFileResolver>,
}

impl SnapshotAccess {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        cache: Arc<SnapshotCache>,
        latest: Arc<LatestFileResolver>,
    ) -> Self {
        Self { source, cache, latest }
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn latest(&self) -> &Arc<LatestFileResolver> {
        &self.latest
    }

    /// 加载快照（缓存命中时不重新解析）
    pub fn load(&self, file_path: &Path) -> ApiResult<Arc<InventorySnapshot>> {
        let snapshot = self.cache.get_or_compute(OP_SNAPSHOT, file_path, &[], CacheDeps::None, || {
            self.source.load_snapshot(file_path)
        })?;
        Ok(snapshot)
    }

    /// 显式文件优先，否则取最新文件
    pub fn target_file(&self, file_path: Option<&Path>) -> ApiResult<PathBuf> {
        match file_path {
            Some(path) => Ok(path.to_path_buf()),
            None => self.latest.resolve_latest_file().ok_or_else(|| {
                ApiError::NoInventoryFile(self.latest.storage_dir().display().to_string())
            }),
        }
    }
}
