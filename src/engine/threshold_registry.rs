// ==========================================
// 重点款库存监控 - 补货阈值注册表
// ==========================================
// 解析顺序（先命中先返回）:
// 1. (款名, 尺码, 颜色) 大小写不敏感精确匹配
// 2. (款名, 尺码) 的通配颜色 "*"；否则按颜色序第一条 (款名, 尺码) 覆写
// 3. 全局默认阈值
// 变更: 内存状态先行，落库失败仅返回 PersistenceWarning（软降级）
// 变更后失效该款缓存与全部批量缓存
// ==========================================

use crate::domain::threshold::{
    PersistenceWarning, ThresholdChange, ThresholdHistoryEntry, ThresholdKey, ThresholdOverride,
    NOTE_MANUAL_SET, NOTE_RESET_TO_DEFAULT, WILDCARD_COLOR,
};
use crate::engine::cache::SnapshotCache;
use crate::engine::error::ThresholdError;
use crate::repository::threshold_repo::ThresholdStore;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// 历史查询条数上限
pub const HISTORY_LIMIT_MAX: usize = 500;

// ==========================================
// ThresholdResolver Trait
// ==========================================
// 用途: 预警/阈值分析引擎只依赖解析能力
pub trait ThresholdResolver: Send + Sync {
    fn resolve(&self, item_name: &str, size: &str, color: &str) -> u32;

    fn default_threshold(&self) -> u32;
}

/// 固定阈值（无覆写）
#[derive(Debug, Clone, Copy)]
pub struct FixedThreshold(pub u32);

impl ThresholdResolver for FixedThreshold {
    fn resolve(&self, _item_name: &str, _size: &str, _color: &str) -> u32 {
        self.0
    }

    fn default_threshold(&self) -> u32 {
        self.0
    }
}

// ==========================================
// ThresholdRegistry
// ==========================================
pub struct ThresholdRegistry {
    default_threshold: u32,
    history_limit_max: usize,
    /// 归一化键 → 覆写（BTreeMap 保证同一 (款名, 尺码) 下颜色有序）
    overrides: RwLock<BTreeMap<ThresholdKey, ThresholdOverride>>,
    /// 本进程内的变更历史（存储不可用时作为查询来源）
    session_history: Mutex<Vec<ThresholdHistoryEntry>>,
    store: Option<Arc<dyn ThresholdStore>>,
    cache: Arc<SnapshotCache>,
    /// 串行化 set/reset 的内存更新 + 落库 + 历史追加
    write_lock: Mutex<()>,
}

impl ThresholdRegistry {
    /// 创建注册表并从存储加载覆写
    ///
    /// 存储加载失败时以空覆写启动（仅告警）
    pub fn new(
        default_threshold: u32,
        store: Option<Arc<dyn ThresholdStore>>,
        cache: Arc<SnapshotCache>,
    ) -> Self {
        let mut overrides = BTreeMap::new();
        if let Some(store) = &store {
            match store.load_overrides() {
                Ok(rows) => {
                    for row in rows {
                        overrides.insert(row.key().normalized(), row);
                    }
                    tracing::info!(count = overrides.len(), "阈值覆写加载完成");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "阈值覆写加载失败，使用默认阈值启动");
                }
            }
        }

        Self {
            default_threshold,
            history_limit_max: HISTORY_LIMIT_MAX,
            overrides: RwLock::new(overrides),
            session_history: Mutex::new(Vec::new()),
            store,
            cache,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_history_limit(mut self, history_limit_max: usize) -> Self {
        self.history_limit_max = history_limit_max.max(1);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ThresholdKey, ThresholdOverride>> {
        self.overrides.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ThresholdKey, ThresholdOverride>> {
        self.overrides.write().unwrap_or_else(|e| e.into_inner())
    }

    fn session(&self) -> MutexGuard<'_, Vec<ThresholdHistoryEntry>> {
        self.session_history.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn validate(key: &ThresholdKey) -> Result<(), ThresholdError> {
        if key.item_name.is_empty() {
            return Err(ThresholdError::EmptyKeyField { field: "item_name" });
        }
        if key.size.is_empty() {
            return Err(ThresholdError::EmptyKeyField { field: "size" });
        }
        if key.color.is_empty() {
            return Err(ThresholdError::EmptyKeyField { field: "color" });
        }
        Ok(())
    }

    /// 设置覆写
    pub fn set(
        &self,
        item_name: &str,
        size: &str,
        color: &str,
        threshold: u32,
    ) -> Result<ThresholdChange, ThresholdError> {
        let key = ThresholdKey::new(item_name, size, color);
        Self::validate(&key)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();

        let value = ThresholdOverride {
            item_name: key.item_name.clone(),
            size: key.size.clone(),
            color: key.color.clone(),
            threshold,
            updated_at: now,
        };
        let old_threshold = self
            .write()
            .insert(key.normalized(), value.clone())
            .map(|old| old.threshold);

        let entry = self.history_entry(&key, old_threshold, threshold, NOTE_MANUAL_SET);
        let persistence_warning = match &self.store {
            Some(store) => store
                .save_override(&value, &entry)
                .err()
                .map(|e| self.persistence_warning(&key, e.to_string())),
            None => None,
        };
        self.session().push(entry);

        let invalidated = self.cache.invalidate_for(&key.item_name);
        tracing::info!(
            key = %key,
            old = ?old_threshold,
            new = threshold,
            invalidated,
            "阈值已设置"
        );

        Ok(ThresholdChange {
            key,
            old_threshold,
            new_threshold: threshold,
            changed_at: now,
            invalidated_cache_entries: invalidated,
            persistence_warning,
        })
    }

    /// 删除覆写，恢复默认
    pub fn reset(
        &self,
        item_name: &str,
        size: &str,
        color: &str,
    ) -> Result<ThresholdChange, ThresholdError> {
        let key = ThresholdKey::new(item_name, size, color);
        Self::validate(&key)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();

        let old_threshold = self.write().remove(&key.normalized()).map(|old| old.threshold);

        let entry = self.history_entry(&key, old_threshold, self.default_threshold, NOTE_RESET_TO_DEFAULT);
        let persistence_warning = match &self.store {
            Some(store) => store
                .delete_override(&key, &entry)
                .err()
                .map(|e| self.persistence_warning(&key, e.to_string())),
            None => None,
        };
        self.session().push(entry);

        let invalidated = self.cache.invalidate_for(&key.item_name);
        tracing::info!(key = %key, old = ?old_threshold, invalidated, "阈值已恢复默认");

        Ok(ThresholdChange {
            key,
            old_threshold,
            new_threshold: self.default_threshold,
            changed_at: now,
            invalidated_cache_entries: invalidated,
            persistence_warning,
        })
    }

    fn history_entry(
        &self,
        key: &ThresholdKey,
        old_threshold: Option<u32>,
        new_threshold: u32,
        note: &str,
    ) -> ThresholdHistoryEntry {
        ThresholdHistoryEntry {
            entry_id: Uuid::new_v4().to_string(),
            item_name: key.item_name.clone(),
            size: key.size.clone(),
            color: key.color.clone(),
            old_threshold,
            new_threshold,
            changed_at: Utc::now(),
            note: Some(note.to_string()),
        }
    }

    fn persistence_warning(&self, key: &ThresholdKey, message: String) -> PersistenceWarning {
        let warning = PersistenceWarning {
            key: key.clone(),
            message,
        };
        tracing::warn!(%warning, "阈值未能落库，内存状态继续生效");
        warning
    }

    /// 当前全部覆写（按款名/尺码/颜色排序）
    pub fn overrides(&self) -> Vec<ThresholdOverride> {
        self.read().values().cloned().collect()
    }

    /// 显式覆写（精确键，不做回退）
    pub fn get_override(&self, item_name: &str, size: &str, color: &str) -> Option<ThresholdOverride> {
        let key = ThresholdKey::new(item_name, size, color).normalized();
        self.read().get(&key).cloned()
    }

    /// 变更历史（最新在前），limit 收敛到 1..=上限
    pub fn history(&self, item_filter: Option<&str>, limit: usize) -> Vec<ThresholdHistoryEntry> {
        let limit = limit.clamp(1, self.history_limit_max);
        let item_filter = item_filter.map(str::trim).filter(|s| !s.is_empty());

        if let Some(store) = &self.store {
            match store.load_history(item_filter, limit) {
                Ok(entries) => return entries,
                Err(e) => {
                    tracing::warn!(error = %e, "阈值历史读取失败，返回本进程内历史");
                }
            }
        }

        let filter = item_filter.map(str::to_uppercase);
        self.session()
            .iter()
            .rev()
            .filter(|e| {
                filter
                    .as_deref()
                    .map(|f| e.item_name.to_uppercase() == f)
                    .unwrap_or(true)
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

impl ThresholdResolver for ThresholdRegistry {
    fn resolve(&self, item_name: &str, size: &str, color: &str) -> u32 {
        let key = ThresholdKey::new(item_name, size, color).normalized();
        let overrides = self.read();

        if let Some(exact) = overrides.get(&key) {
            return exact.threshold;
        }

        let wildcard = ThresholdKey {
            item_name: key.item_name.clone(),
            size: key.size.clone(),
            color: WILDCARD_COLOR.to_string(),
        };
        if let Some(any_color) = overrides.get(&wildcard) {
            return any_color.threshold;
        }

        // 同一 (款名, 尺码) 的首个覆写（颜色有序）
        let lower = ThresholdKey {
            item_name: key.item_name.clone(),
            size: key.size.clone(),
            color: String::new(),
        };
        if let Some((_, first)) = overrides
            .range(lower..)
            .next()
            .filter(|(k, _)| k.item_name == key.item_name && k.size == key.size)
        {
            return first.threshold;
        }

        self.default_threshold
    }

    fn default_threshold(&self) -> u32 {
        self.default_threshold
    }
}
