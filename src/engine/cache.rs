// ==========================================
// 重点款库存监控 - 快照派生结果缓存
// ==========================================
// 职责: 按文件签名缓存昂贵的派生结果（快照、重点款、预警、对比）
// 有效条件: 存活时间 < TTL 且 条目内嵌的 mtime 等于文件当前 mtime
// 失效范围:
// - clear_all: 新文件成为"最新"时全部清空
// - invalidate_for(item): 阈值变更，清除该款条目与全部批量条目
// 容量: 写入前清理过期条目；超出上限时淘汰最早写入的条目
// 并发: compute 在锁外执行；并发未命中可能重复计算，结果等价，后写覆盖
// 代际: 计算前记录依赖的代际号，计算期间发生失效则结果不入库
// ==========================================

use crate::domain::snapshot::SnapshotSignature;
use serde::Serialize;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, UNIX_EPOCH};

/// 默认 TTL（秒）
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// 默认条目上限
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;

// ==========================================
// CacheKey - 缓存键
// ==========================================
/// 文件路径 + 修改时间（纳秒）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub modified_nanos: u128,
}

impl From<&SnapshotSignature> for SourceStamp {
    fn from(sig: &SnapshotSignature) -> Self {
        let modified_nanos = sig
            .modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self {
            path: sig.file_path.clone(),
            modified_nanos,
        }
    }
}

/// (operation, 文件签名列表, 参数)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: String,
    pub sources: Vec<SourceStamp>,
    pub args: Vec<String>,
}

impl CacheKey {
    /// 稳定哈希（日志/统计用）
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// 存储槽位: 不含 mtime，同一槽位同一时刻只保留一个条目
    fn slot(&self) -> CacheSlot {
        CacheSlot {
            operation: self.operation.clone(),
            paths: self.sources.iter().map(|s| s.path.clone()).collect(),
            args: self.args.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheSlot {
    operation: String,
    paths: Vec<PathBuf>,
    args: Vec<String>,
}

// ==========================================
// CacheDeps - 条目依赖（用于定向失效）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDeps {
    /// 不受阈值影响（快照、重点款、对比）
    None,
    /// 依赖指定款的阈值
    Items(Vec<String>),
    /// 依赖全部款的阈值（批量预警）
    AllItems,
}

struct CacheEntry {
    key: CacheKey,
    value: Arc<dyn Any + Send + Sync>,
    created_at: Instant,
    /// 写入序号（淘汰顺序）
    seq: u64,
    deps: CacheDeps,
}

/// 计算开始时依赖的代际号
#[derive(Debug, Clone, PartialEq, Eq)]
struct DepsStamp {
    epoch: u64,
    batch: Option<u64>,
    items: Vec<u64>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheSlot, CacheEntry>,
    /// 款名（大写）→ 依赖该款的槽位
    item_index: HashMap<String, HashSet<CacheSlot>>,
    /// 批量条目槽位
    batch_slots: HashSet<CacheSlot>,
    /// clear_all 计数
    epoch: u64,
    /// 批量条目的失效计数
    batch_generation: u64,
    /// 款名（大写）→ 失效计数
    item_generations: HashMap<String, u64>,
    next_seq: u64,
}

impl CacheState {
    fn stamp(&self, deps: &CacheDeps) -> DepsStamp {
        match deps {
            CacheDeps::None => DepsStamp {
                epoch: self.epoch,
                batch: None,
                items: Vec::new(),
            },
            CacheDeps::Items(items) => DepsStamp {
                epoch: self.epoch,
                batch: None,
                items: items
                    .iter()
                    .map(|item| {
                        self.item_generations
                            .get(&item.trim().to_uppercase())
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect(),
            },
            CacheDeps::AllItems => DepsStamp {
                epoch: self.epoch,
                batch: Some(self.batch_generation),
                items: Vec::new(),
            },
        }
    }

    fn prune_expired(&mut self, ttl: Duration) -> usize {
        let expired: Vec<CacheSlot> = self
            .entries
            .iter()
            .filter(|(_, e)| e.created_at.elapsed() >= ttl)
            .map(|(slot, _)| slot.clone())
            .collect();

        expired.iter().filter(|slot| self.remove(slot)).count()
    }

    fn evict_oldest(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.seq)
            .map(|(slot, _)| slot.clone());
        match victim {
            Some(slot) => self.remove(&slot),
            None => false,
        }
    }

    fn remove(&mut self, slot: &CacheSlot) -> bool {
        let Some(entry) = self.entries.remove(slot) else {
            return false;
        };
        match &entry.deps {
            CacheDeps::None => {}
            CacheDeps::Items(items) => {
                for item in items {
                    let key = item.trim().to_uppercase();
                    if let Some(slots) = self.item_index.get_mut(&key) {
                        slots.remove(slot);
                        if slots.is_empty() {
                            self.item_index.remove(&key);
                        }
                    }
                }
            }
            CacheDeps::AllItems => {
                self.batch_slots.remove(slot);
            }
        }
        true
    }

    fn insert(&mut self, slot: CacheSlot, mut entry: CacheEntry) {
        self.remove(&slot);
        entry.seq = self.next_seq;
        self.next_seq += 1;
        match &entry.deps {
            CacheDeps::None => {}
            CacheDeps::Items(items) => {
                for item in items {
                    self.item_index
                        .entry(item.trim().to_uppercase())
                        .or_default()
                        .insert(slot.clone());
                }
            }
            CacheDeps::AllItems => {
                self.batch_slots.insert(slot.clone());
            }
        }
        self.entries.insert(slot, entry);
    }
}

// ==========================================
// CacheStats - 缓存统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub live_entries: usize,
    pub indexed_items: usize,
    pub batch_entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub evictions: u64,
    pub discarded_stale: u64,
    pub ttl_secs: u64,
}

// ==========================================
// SnapshotCache
// ==========================================
pub struct SnapshotCache {
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    evictions: AtomicU64,
    discarded_stale: AtomicU64,
}

impl SnapshotCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            discarded_stale: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // 缓存内容均可重算，锁中毒时直接沿用内部状态
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 单文件派生结果
    pub fn get_or_compute<T, E, F>(
        &self,
        operation: &str,
        file_path: &Path,
        args: &[&str],
        deps: CacheDeps,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_compute_multi(operation, &[file_path], args, deps, compute)
    }

    /// 多文件派生结果（任一文件 mtime 变化即失效）
    pub fn get_or_compute_multi<T, E, F>(
        &self,
        operation: &str,
        file_paths: &[&Path],
        args: &[&str],
        deps: CacheDeps,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        // 读取当前签名；读不到（文件缺失）时绕过缓存，由 compute 报告错误
        let sources: Option<Vec<SourceStamp>> = file_paths
            .iter()
            .map(|p| SnapshotSignature::of(p).ok().map(|s| SourceStamp::from(&s)))
            .collect();

        let Some(sources) = sources else {
            tracing::debug!(operation, "文件签名不可读，绕过缓存");
            return compute().map(Arc::new);
        };

        let key = CacheKey {
            operation: operation.to_string(),
            sources,
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        let slot = key.slot();

        if let Some(value) = self.lookup::<T>(&slot, &key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(operation, fingerprint = key.fingerprint(), "缓存命中");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let stamp = self.state().stamp(&deps);
        let value = Arc::new(compute()?);

        // 以计算前读取的签名入库: 计算期间文件被改写，下次查找必然未命中
        let stored: Arc<dyn Any + Send + Sync> = value.clone();
        self.store(
            slot,
            CacheEntry {
                key,
                value: stored,
                created_at: Instant::now(),
                seq: 0,
                deps,
            },
            &stamp,
        );

        Ok(value)
    }

    fn store(&self, slot: CacheSlot, entry: CacheEntry, stamp: &DepsStamp) {
        let mut state = self.state();

        if state.stamp(&entry.deps) != *stamp {
            self.discarded_stale.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(operation = %entry.key.operation, "计算期间依赖已失效，结果不入库");
            return;
        }

        state.prune_expired(self.ttl);
        let mut evicted = 0u64;
        while !state.entries.contains_key(&slot)
            && state.entries.len() >= self.max_entries
            && state.evict_oldest()
        {
            evicted += 1;
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::debug!(evicted, max_entries = self.max_entries, "缓存已满，淘汰最早条目");
        }

        state.insert(slot, entry);
    }

    fn lookup<T: Send + Sync + 'static>(&self, slot: &CacheSlot, key: &CacheKey) -> Option<Arc<T>> {
        let mut state = self.state();
        let fresh = match state.entries.get(slot) {
            Some(entry) => entry.key == *key && entry.created_at.elapsed() < self.ttl,
            None => return None,
        };

        if !fresh {
            state.remove(slot);
            return None;
        }

        let value = state.entries.get(slot)?.value.clone();
        value.downcast::<T>().ok()
    }

    /// 清空全部条目
    pub fn clear_all(&self) -> usize {
        let mut state = self.state();
        let removed = state.entries.len();
        state.entries.clear();
        state.item_index.clear();
        state.batch_slots.clear();
        state.epoch += 1;
        self.invalidations.fetch_add(removed as u64, Ordering::Relaxed);
        tracing::info!(removed, "缓存已全部清空");
        removed
    }

    /// 清除依赖某款阈值的条目（含全部批量条目）
    pub fn invalidate_for(&self, item_name: &str) -> usize {
        let mut state = self.state();
        let item_key = item_name.trim().to_uppercase();

        *state.item_generations.entry(item_key.clone()).or_insert(0) += 1;
        state.batch_generation += 1;

        let mut slots: Vec<CacheSlot> = state
            .item_index
            .get(&item_key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        slots.extend(state.batch_slots.iter().cloned());

        let removed = slots.iter().filter(|slot| state.remove(slot)).count();
        self.invalidations.fetch_add(removed as u64, Ordering::Relaxed);
        tracing::debug!(item = item_name, removed, "按款失效缓存");
        removed
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state();
        CacheStats {
            entries: state.entries.len(),
            live_entries: state
                .entries
                .values()
                .filter(|e| e.created_at.elapsed() < self.ttl)
                .count(),
            indexed_items: state.item_index.len(),
            batch_entries: state.batch_slots.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            discarded_stale: self.discarded_stale.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            DEFAULT_CACHE_MAX_ENTRIES,
        )
    }
}
