// ==========================================
// 重点款库存监控 - 对比 API
// ==========================================
// 职责:
// - 两期文件对比（仪表盘/报表协作方）
// - 最新 vs 上一期 的阈值变动分析
// ==========================================

use crate::api::alert_api::AlertApi;
use crate::api::error::{ApiError, ApiResult};
use crate::api::snapshot_access::SnapshotAccess;
use crate::domain::alert::{AlertRecord, ThresholdChangeReport};
use crate::domain::comparison::{ComparisonFeed, ComparisonRecord};
use crate::domain::snapshot::InventorySnapshot;
use crate::engine::cache::CacheDeps;
use crate::engine::comparison::ComparisonEngine;
use crate::engine::threshold_analysis::ThresholdChangeAnalyzer;
use std::path::Path;
use std::sync::Arc;

const OP_COMPARISON: &str = "comparison";
const OP_THRESHOLD_ANALYSIS: &str = "threshold_analysis";

pub struct ComparisonApi {
    snapshots: Arc<SnapshotAccess>,
    alerts: Arc<AlertApi>,
    engine: ComparisonEngine,
    tracked_season_code: String,
}

impl ComparisonApi {
    pub fn new(
        snapshots: Arc<SnapshotAccess>,
        alerts: Arc<AlertApi>,
        top_movers_limit: usize,
        tracked_season_code: &str,
    ) -> Self {
        Self {
            snapshots,
            alerts,
            engine: ComparisonEngine::new(top_movers_limit)
                .with_tracked_season(Some(tracked_season_code)),
            tracked_season_code: tracked_season_code.to_string(),
        }
    }

    fn load_tracked(&self, file_path: &Path, position: &'static str) -> ApiResult<Arc<InventorySnapshot>> {
        let snapshot = self.snapshots.load(file_path)?;
        if snapshot
            .tracked_records(&self.tracked_season_code)
            .next()
            .is_none()
        {
            return Err(ApiError::NoTrackedItems {
                season_code: self.tracked_season_code.clone(),
                position,
            });
        }
        Ok(snapshot)
    }

    /// 逐变体对比明细
    pub fn compare_records(&self, old_file: &Path, new_file: &Path) -> ApiResult<Vec<ComparisonRecord>> {
        let old = self.load_tracked(old_file, "first")?;
        let new = self.load_tracked(new_file, "second")?;
        Ok(self.engine.compare(&old, &new))
    }

    /// 对比输出（按两文件签名缓存）
    pub fn compare_files(&self, old_file: &Path, new_file: &Path) -> ApiResult<Arc<ComparisonFeed>> {
        self.snapshots.cache().get_or_compute_multi(
            OP_COMPARISON,
            &[old_file, new_file],
            &[],
            CacheDeps::None,
            || -> ApiResult<ComparisonFeed> {
                let old = self.load_tracked(old_file, "first")?;
                let new = self.load_tracked(new_file, "second")?;
                let feed = self.engine.feed(&old, &new);

                tracing::info!(
                    old = %old_file.display(),
                    new = %new_file.display(),
                    rows = feed.total_items_analyzed,
                    "两期对比完成"
                );
                Ok(feed)
            },
        )
    }

    fn low_stock(&self, file_path: &Path) -> ApiResult<Vec<AlertRecord>> {
        match self.alerts.batch_alerts(Some(file_path)) {
            Ok(report) => Ok(ThresholdChangeAnalyzer::low_stock(&report)),
            // 无重点款视为无预警
            Err(ApiError::NoKeyItems { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// 最新文件 vs 上一期文件 的阈值变动分析
    pub fn threshold_change_analysis(&self) -> ApiResult<Arc<ThresholdChangeReport>> {
        let latest = self.snapshots.target_file(None)?;
        let previous = self.snapshots.latest().previous_file(&latest);
        let latest_name = file_name(&latest);

        let Some(previous) = previous else {
            let current = self.low_stock(&latest)?;
            return Ok(Arc::new(ThresholdChangeAnalyzer::analyze(&latest_name, current, None)));
        };

        self.snapshots.cache().get_or_compute_multi(
            OP_THRESHOLD_ANALYSIS,
            &[latest.as_path(), previous.as_path()],
            &[],
            CacheDeps::AllItems,
            || -> ApiResult<ThresholdChangeReport> {
                let current = self.low_stock(&latest)?;
                let previous_name = file_name(&previous);
                let before = match self.low_stock(&previous) {
                    Ok(alerts) => Some((previous_name.as_str(), alerts)),
                    Err(e) => {
                        tracing::warn!(file = %previous.display(), error = %e, "上一期文件不可用，按基线分析");
                        None
                    }
                };
                Ok(ThresholdChangeAnalyzer::analyze(&latest_name, current, before))
            },
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
