// ==========================================
// 饲料装车看板 - 应用状态
// ==========================================
// 职责: 装配共享连接、配置、快照仓储与看板 API
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiResult, KanbanApi};
use crate::config::{ConfigManager, KanbanConfig};
use crate::db::{configure_sqlite_connection, ensure_schema_version};
use crate::domain::{Actor, DemandPriority, FleetType, RationPayload};
use crate::engine::{
    Clock, KanbanEngine, PreparationQueue, SystemClock, SECTOR_GATEHOUSE, SECTOR_LOGISTICS,
    SECTOR_SHIPPING,
};
use crate::repository::KanbanSnapshotRepository;

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的看板配置
    pub config: KanbanConfig,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 快照仓储
    pub snapshot_repo: Arc<KanbanSnapshotRepository>,

    /// 看板API
    pub kanban_api: Arc<KanbanApi>,
}

impl AppState {
    /// 使用系统时钟初始化
    pub fn new(db_path: String) -> ApiResult<Self> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// 使用指定时钟初始化 (测试/回放)
    ///
    /// 若仓储中已有快照,看板从最近快照恢复
    pub fn with_clock(db_path: String, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("无法打开数据库: {}", e)))?;
        configure_sqlite_connection(&conn)
            .and_then(|_| ensure_schema_version(&conn))
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone())?);
        let config = config_manager.load_kanban_config()?;
        let permissions = Arc::new(config_manager.sector_permission_oracle()?);
        let snapshot_repo = Arc::new(KanbanSnapshotRepository::from_connection(conn)?);

        let engine = KanbanEngine::new(permissions, clock);
        let kanban_api = Arc::new(
            KanbanApi::new(engine, config.clone()).with_snapshot_repo(snapshot_repo.clone()),
        );

        if kanban_api.restore_latest()? {
            tracing::info!("看板状态已从快照恢复");
        }

        Ok(Self {
            db_path,
            config,
            config_manager,
            snapshot_repo,
            kanban_api,
        })
    }

    /// 空看板时写入一组示例货物并保存快照
    ///
    /// # 返回
    /// - Ok(Some(snapshot_id)): 已写入示例数据
    /// - Ok(None): 看板非空,不做任何写入
    pub fn seed_demo_if_empty(&self) -> ApiResult<Option<String>> {
        if !self.kanban_api.snapshot()?.cargo_records.is_empty() {
            return Ok(None);
        }

        let api = &self.kanban_api;
        let logistics = Actor::new("logistica", SECTOR_LOGISTICS);
        let gatehouse = Actor::new("portaria", SECTOR_GATEHOUSE);
        let shipping = Actor::new("expedicao", SECTOR_SHIPPING);

        let mut queue = PreparationQueue::new();
        let owned = queue.add_draft("4521", 32_000.0, None, FleetType::Owned)?;
        let contracted = queue.add_draft(
            "4522",
            28_500.0,
            Some("Broiler grower".to_string()),
            FleetType::Contracted,
        )?;
        let pickup = queue.add_draft("4523", 9_000.0, None, FleetType::Pickup)?;

        api.dispatch_from_queue(&mut queue, &logistics)?;

        api.move_cargo(&contracted.id, "awaiting-loading", &gatehouse, None)?;
        api.move_cargo(&owned.id, "loading", &shipping, None)?;
        api.move_cargo(
            &pickup.id,
            "awaiting-ration",
            &logistics,
            Some(RationPayload::new("Starter Feed", 120, DemandPriority::High)),
        )?;

        let snapshot_id = api.save_snapshot()?;
        tracing::info!(snapshot_id = %snapshot_id, "示例数据已写入,快照已保存");
        Ok(Some(snapshot_id))
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 FEED_KANBAN_DB_PATH,否则放在用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("FEED_KANBAN_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./feed_cargo_kanban.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("feed-cargo-kanban");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("feed_cargo_kanban.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
    }
}
