// ==========================================
// 饲料装车看板 - 看板快照数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑 (快照校验在引擎 restore 中完成)
// 存储: kanban_snapshot 表,快照整体以 JSON 保存
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::snapshot::KanbanSnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

/// 快照元数据 (不含正文)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub snapshot_id: String,
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub cargo_count: usize,
    pub demand_count: usize,
}

// ==========================================
// KanbanSnapshotRepository - 看板快照仓储
// ==========================================
pub struct KanbanSnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl KanbanSnapshotRepository {
    /// 创建新的 KanbanSnapshotRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kanban_snapshot (
              seq INTEGER PRIMARY KEY AUTOINCREMENT,
              snapshot_id TEXT NOT NULL UNIQUE,
              version INTEGER NOT NULL,
              taken_at TEXT NOT NULL,
              cargo_count INTEGER NOT NULL,
              demand_count INTEGER NOT NULL,
              payload_json TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// 保存快照
    ///
    /// # 返回
    /// - Ok(String): 新快照 ID
    pub fn save(&self, snapshot: &KanbanSnapshot) -> RepositoryResult<String> {
        let payload = serde_json::to_string(snapshot)?;
        let snapshot_id = Uuid::new_v4().to_string();

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO kanban_snapshot (
                snapshot_id, version, taken_at, cargo_count, demand_count, payload_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                snapshot_id,
                snapshot.version,
                snapshot.taken_at.to_rfc3339(),
                snapshot.cargo_records.len() as i64,
                snapshot.ration_demands.len() as i64,
                payload,
            ],
        )?;

        info!(
            snapshot_id = %snapshot_id,
            cargo_count = snapshot.cargo_records.len(),
            demand_count = snapshot.ration_demands.len(),
            "看板快照已保存"
        );
        Ok(snapshot_id)
    }

    /// 最近保存的快照
    pub fn load_latest(&self) -> RepositoryResult<Option<KanbanSnapshot>> {
        let conn = self.get_conn()?;
        let payload = conn
            .query_row(
                "SELECT payload_json FROM kanban_snapshot ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        payload
            .map(|raw| serde_json::from_str(&raw).map_err(RepositoryError::from))
            .transpose()
    }

    /// 按 ID 查询快照
    pub fn find_by_id(&self, snapshot_id: &str) -> RepositoryResult<KanbanSnapshot> {
        let conn = self.get_conn()?;
        let payload = conn
            .query_row(
                "SELECT payload_json FROM kanban_snapshot WHERE snapshot_id = ?1",
                params![snapshot_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "KanbanSnapshot".to_string(),
                id: snapshot_id.to_string(),
            })?;

        Ok(serde_json::from_str(&payload)?)
    }

    /// 最近的快照元数据（新 → 旧）
    pub fn list(&self, limit: usize) -> RepositoryResult<Vec<SnapshotMeta>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT snapshot_id, version, taken_at, cargo_count, demand_count
            FROM kanban_snapshot
            ORDER BY seq DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (snapshot_id, version, taken_at, cargo_count, demand_count) = row?;
            let taken_at = DateTime::parse_from_rfc3339(&taken_at)
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "taken_at".to_string(),
                    message: e.to_string(),
                })?
                .with_timezone(&Utc);
            out.push(SnapshotMeta {
                snapshot_id,
                version,
                taken_at,
                cargo_count: cargo_count.max(0) as usize,
                demand_count: demand_count.max(0) as usize,
            });
        }
        Ok(out)
    }
}
