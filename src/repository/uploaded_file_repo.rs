// ==========================================
// 重点款库存监控 - 上传文件登记仓储
// ==========================================
// 表: uploaded_files（is_active = 1 的行即"最新文件"指针）
// 约束: 同一时刻至多一行 is_active = 1（切换在事务内完成）
// 保留: cleanup_inactive 删除过期的非激活登记，激活行永不删除
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::threshold_repo::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 上传文件登记记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileEntity {
    pub file_id: String,
    pub filename: String,
    pub file_path: PathBuf,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub is_active: bool,
}

/// 过期登记清理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InactiveCleanup {
    /// 已删除的登记行
    pub removed: Vec<UploadedFileEntity>,
    /// 删除后不再被任何登记引用的文件路径
    pub orphaned_paths: Vec<PathBuf>,
}

// ==========================================
// LatestFilePointer Trait
// ==========================================
pub trait LatestFilePointer: Send + Sync {
    /// 当前激活文件（无则 None）
    fn active_file(&self) -> RepositoryResult<Option<UploadedFileEntity>>;

    /// 登记新文件并设为激活（其余行全部取消激活）
    fn register_active(&self, file_path: &Path, size_bytes: u64) -> RepositoryResult<UploadedFileEntity>;

    /// 删除登记时间早于 cutoff 的非激活行
    fn cleanup_inactive(&self, cutoff: DateTime<Utc>) -> RepositoryResult<InactiveCleanup>;
}

// ==========================================
// SqliteUploadedFileRepository
// ==========================================
pub struct SqliteUploadedFileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUploadedFileRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记历史（最新在前）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<UploadedFileEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT file_id, filename, file_path, size_bytes, uploaded_at, is_active
            FROM uploaded_files
            ORDER BY uploaded_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], map_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadedFileEntity> {
    let size: i64 = row.get(3)?;
    Ok(UploadedFileEntity {
        file_id: row.get(0)?,
        filename: row.get(1)?,
        file_path: PathBuf::from(row.get::<_, String>(2)?),
        size_bytes: size.max(0) as u64,
        uploaded_at: parse_timestamp(4, row.get(4)?)?,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}

impl LatestFilePointer for SqliteUploadedFileRepository {
    fn active_file(&self) -> RepositoryResult<Option<UploadedFileEntity>> {
        let conn = self.get_conn()?;
        let entity = conn
            .query_row(
                r#"
                SELECT file_id, filename, file_path, size_bytes, uploaded_at, is_active
                FROM uploaded_files
                WHERE is_active = 1
                ORDER BY uploaded_at DESC, rowid DESC
                LIMIT 1
                "#,
                [],
                map_entity,
            )
            .optional()?;
        Ok(entity)
    }

    fn register_active(&self, file_path: &Path, size_bytes: u64) -> RepositoryResult<UploadedFileEntity> {
        let entity = UploadedFileEntity {
            file_id: Uuid::new_v4().to_string(),
            filename: file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: file_path.to_path_buf(),
            size_bytes,
            uploaded_at: Utc::now(),
            is_active: true,
        };

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE uploaded_files SET is_active = 0 WHERE is_active = 1", [])?;
        tx.execute(
            r#"
            INSERT INTO uploaded_files (file_id, filename, file_path, size_bytes, uploaded_at, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            "#,
            params![
                entity.file_id,
                entity.filename,
                entity.file_path.display().to_string(),
                entity.size_bytes as i64,
                format_timestamp(&entity.uploaded_at),
            ],
        )?;
        tx.commit()?;

        tracing::info!(file = %entity.file_path.display(), "登记最新库存文件");
        Ok(entity)
    }

    fn cleanup_inactive(&self, cutoff: DateTime<Utc>) -> RepositoryResult<InactiveCleanup> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = {
            let mut stmt = tx.prepare(
                r#"
                SELECT file_id, filename, file_path, size_bytes, uploaded_at, is_active
                FROM uploaded_files
                WHERE is_active = 0
                "#,
            )?;
            let rows = stmt
                .query_map([], map_entity)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        let removed: Vec<UploadedFileEntity> =
            rows.into_iter().filter(|e| e.uploaded_at < cutoff).collect();

        for entity in &removed {
            tx.execute("DELETE FROM uploaded_files WHERE file_id = ?1", params![entity.file_id])?;
        }

        // 同一文件可能被多次登记，仍被引用的路径不能当作孤立文件
        let still_referenced: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT DISTINCT file_path FROM uploaded_files")?;
            let paths = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<HashSet<_>, _>>()?;
            paths
        };
        tx.commit()?;

        let mut orphaned_paths: Vec<PathBuf> = Vec::new();
        for entity in &removed {
            let path = &entity.file_path;
            if !still_referenced.contains(&path.display().to_string()) && !orphaned_paths.contains(path) {
                orphaned_paths.push(path.clone());
            }
        }

        tracing::info!(
            removed = removed.len(),
            orphaned = orphaned_paths.len(),
            cutoff = %cutoff,
            "过期上传登记已清理"
        );
        Ok(InactiveCleanup {
            removed,
            orphaned_paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::configure_sqlite_connection;

    fn repo() -> SqliteUploadedFileRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SqliteUploadedFileRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_single_active_pointer() {
        let repo = repo();
        assert!(repo.active_file().unwrap().is_none());

        repo.register_active(Path::new("/data/uploads/a.xlsx"), 10).unwrap();
        repo.register_active(Path::new("/data/uploads/b.xlsx"), 20).unwrap();

        let active = repo.active_file().unwrap().unwrap();
        assert_eq!(active.filename, "b.xlsx");
        assert_eq!(active.size_bytes, 20);

        let all = repo.list_recent(10).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|e| e.is_active).count(), 1);
    }

    fn age_row(repo: &SqliteUploadedFileRepository, file_id: &str, days: i64) {
        let ts = format_timestamp(&(Utc::now() - chrono::Duration::days(days)));
        repo.get_conn()
            .unwrap()
            .execute(
                "UPDATE uploaded_files SET uploaded_at = ?1 WHERE file_id = ?2",
                params![ts, file_id],
            )
            .unwrap();
    }

    #[test]
    fn test_cleanup_inactive_keeps_active_and_recent() {
        let repo = repo();
        let old = repo.register_active(Path::new("/data/uploads/old.xlsx"), 1).unwrap();
        let recent = repo.register_active(Path::new("/data/uploads/recent.xlsx"), 2).unwrap();
        let active = repo.register_active(Path::new("/data/uploads/active.xlsx"), 3).unwrap();
        age_row(&repo, &old.file_id, 40);
        age_row(&repo, &recent.file_id, 5);
        age_row(&repo, &active.file_id, 90);

        let outcome = repo
            .cleanup_inactive(Utc::now() - chrono::Duration::days(30))
            .unwrap();

        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.removed[0].file_id, old.file_id);
        assert_eq!(outcome.orphaned_paths, vec![PathBuf::from("/data/uploads/old.xlsx")]);

        let remaining: Vec<String> = repo.list_recent(10).unwrap().into_iter().map(|e| e.filename).collect();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&"active.xlsx".to_string()));
        assert_eq!(repo.active_file().unwrap().unwrap().file_id, active.file_id);
    }

    #[test]
    fn test_cleanup_keeps_path_still_referenced() {
        let repo = repo();
        let path = Path::new("/data/uploads/week1.xlsx");
        let first = repo.register_active(path, 1).unwrap();
        repo.register_active(Path::new("/data/uploads/week2.xlsx"), 1).unwrap();
        // 自愈再次登记同一文件
        repo.register_active(path, 1).unwrap();
        age_row(&repo, &first.file_id, 40);

        let outcome = repo
            .cleanup_inactive(Utc::now() - chrono::Duration::days(30))
            .unwrap();
        assert_eq!(outcome.removed.len(), 1);
        assert!(outcome.orphaned_paths.is_empty());
    }
}
