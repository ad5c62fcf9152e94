// ==========================================
// 重点款库存监控 - 预警 API
// ==========================================
// 职责: 批量预警、单款预警、预警输出、搜索、可选项
// 缓存依赖:
// - batch_alerts 依赖全部款（任意阈值变更即失效）
// - item_alerts  依赖单款
// - key_items / item_options 与阈值无关
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::snapshot_access::SnapshotAccess;
use crate::domain::alert::{AlertFeedEntry, AlertReport, ItemAlertSummary, ItemOptions};
use crate::engine::alert::AlertEngine;
use crate::engine::cache::CacheDeps;
use crate::engine::threshold_registry::ThresholdRegistry;
use std::path::Path;
use std::sync::Arc;

const OP_KEY_ITEMS: &str = "key_items";
const OP_BATCH_ALERTS: &str = "batch_alerts";
const OP_ITEM_ALERTS: &str = "item_alerts";
const OP_ITEM_OPTIONS: &str = "item_options";

pub struct AlertApi {
    snapshots: Arc<SnapshotAccess>,
    thresholds: Arc<ThresholdRegistry>,
    engine: AlertEngine,
}

impl AlertApi {
    pub fn new(
        snapshots: Arc<SnapshotAccess>,
        thresholds: Arc<ThresholdRegistry>,
        engine: AlertEngine,
    ) -> Self {
        Self {
            snapshots,
            thresholds,
            engine,
        }
    }

    pub fn tracked_season_code(&self) -> &str {
        self.engine.tracked_season_code()
    }

    /// 重点款款名
    pub fn key_items(&self, file_path: Option<&Path>) -> ApiResult<Arc<Vec<String>>> {
        let file = self.snapshots.target_file(file_path)?;
        self.snapshots
            .cache()
            .get_or_compute(OP_KEY_ITEMS, &file, &[], CacheDeps::None, || {
                let snapshot = self.snapshots.load(&file)?;
                Ok::<_, ApiError>(self.engine.detect_key_items(&snapshot))
            })
    }

    /// 批量预警（全部重点款）
    pub fn batch_alerts(&self, file_path: Option<&Path>) -> ApiResult<Arc<AlertReport>> {
        let file = self.snapshots.target_file(file_path)?;
        self.snapshots
            .cache()
            .get_or_compute(OP_BATCH_ALERTS, &file, &[], CacheDeps::AllItems, || -> ApiResult<AlertReport> {
                let snapshot = self.snapshots.load(&file)?;
                let key_items = self.engine.detect_key_items(&snapshot);
                if key_items.is_empty() {
                    return Err(ApiError::NoKeyItems {
                        file: snapshot.signature.file_name(),
                    });
                }

                let report = self
                    .engine
                    .compute_alerts(&snapshot, &key_items, self.thresholds.as_ref());
                tracing::info!(
                    file = %file.display(),
                    items = report.len(),
                    "批量预警计算完成"
                );
                Ok(report)
            })
    }

    /// 单款预警
    pub fn item_alerts(
        &self,
        item_name: &str,
        file_path: Option<&Path>,
    ) -> ApiResult<Arc<ItemAlertSummary>> {
        let item_name = item_name.trim();
        if item_name.is_empty() {
            return Err(ApiError::InvalidInput("款名不能为空".to_string()));
        }

        let file = self.snapshots.target_file(file_path)?;
        let cache_arg = item_name.to_uppercase();
        self.snapshots.cache().get_or_compute(
            OP_ITEM_ALERTS,
            &file,
            &[cache_arg.as_str()],
            CacheDeps::Items(vec![cache_arg.clone()]),
            || -> ApiResult<ItemAlertSummary> {
                let snapshot = self.snapshots.load(&file)?;
                self.engine
                    .item_alerts(&snapshot, item_name, self.thresholds.as_ref())
                    .ok_or_else(|| ApiError::NotFound(format!("重点款 {} 不在文件中", item_name)))
            },
        )
    }

    /// 展平的预警输出（邮件/报表协作方）
    pub fn alert_feed(&self, file_path: Option<&Path>) -> ApiResult<Vec<AlertFeedEntry>> {
        let report = self.batch_alerts(file_path)?;
        Ok(AlertEngine::alert_feed(&report))
    }

    /// 在当前预警中搜索
    pub fn search_alerts(
        &self,
        term: &str,
        file_path: Option<&Path>,
    ) -> ApiResult<Vec<AlertFeedEntry>> {
        let report = self.batch_alerts(file_path)?;
        Ok(AlertEngine::search(&report, term))
    }

    /// 单款可选颜色/尺码
    pub fn item_options(
        &self,
        item_name: &str,
        file_path: Option<&Path>,
    ) -> ApiResult<Arc<ItemOptions>> {
        let item_name = item_name.trim();
        if item_name.is_empty() {
            return Err(ApiError::InvalidInput("款名不能为空".to_string()));
        }

        let file = self.snapshots.target_file(file_path)?;
        let cache_arg = item_name.to_uppercase();
        self.snapshots
            .cache()
            .get_or_compute(OP_ITEM_OPTIONS, &file, &[cache_arg.as_str()], CacheDeps::None, || {
                let snapshot = self.snapshots.load(&file)?;
                Ok::<_, ApiError>(self.engine.item_options(&snapshot, item_name))
            })
    }
}
