// ==========================================
// 饲料装车看板 - 看板 API
// ==========================================
// 职责: 下发、迁移、饲料需求、看板视图、报表、快照
// 红线: 所有写操作在同一把锁内串行执行 (单写者)
// 红线: 报表在锁外计算,只读取克隆出的数据
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::kanban_config::KanbanConfig;
use crate::domain::cargo::{Cargo, RationPayload};
use crate::domain::ration_demand::RationDemand;
use crate::domain::snapshot::KanbanSnapshot;
use crate::domain::types::{status_definition, Actor, CargoStatus, FabricationStatus};
use crate::engine::kanban::KanbanEngine;
use crate::engine::preparation::PreparationQueue;
use crate::engine::reporting::{KanbanReport, ReportFilter, ReportingAggregator};
use crate::repository::snapshot_repo::KanbanSnapshotRepository;

/// 看板列 (按流程顺序)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanColumn {
    pub status: CargoStatus,
    pub label: String,
    pub ordinal: usize,
    pub cargos: Vec<Cargo>,
}

// ==========================================
// KanbanApi - 看板 API
// ==========================================
pub struct KanbanApi {
    engine: Mutex<KanbanEngine>,
    aggregator: ReportingAggregator,
    snapshot_repo: Option<Arc<KanbanSnapshotRepository>>,
}

impl KanbanApi {
    /// 创建新的 KanbanApi 实例
    pub fn new(engine: KanbanEngine, config: KanbanConfig) -> Self {
        Self {
            engine: Mutex::new(engine),
            aggregator: ReportingAggregator::new(config),
            snapshot_repo: None,
        }
    }

    /// 挂接快照仓储
    pub fn with_snapshot_repo(mut self, repo: Arc<KanbanSnapshotRepository>) -> Self {
        self.snapshot_repo = Some(repo);
        self
    }

    fn lock_engine(&self) -> ApiResult<MutexGuard<'_, KanbanEngine>> {
        self.engine
            .lock()
            .map_err(|e| ApiError::InternalError(format!("看板引擎锁获取失败: {}", e)))
    }

    fn check_actor(actor: &Actor) -> ApiResult<()> {
        if actor.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        Ok(())
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 将准备队列整体下发到看板
    ///
    /// 下发成功后才清空队列; 失败时队列保持原样
    ///
    /// # 返回
    /// - Ok(Vec<Cargo>): 新建的看板货物
    /// - Err(PermissionDenied): 部门不可维护准备队列
    pub fn dispatch_from_queue(
        &self,
        queue: &mut PreparationQueue,
        actor: &Actor,
    ) -> ApiResult<Vec<Cargo>> {
        Self::check_actor(actor)?;
        let mut engine = self.lock_engine()?;

        if !engine.can_manage_queue(actor) {
            warn!(actor = %actor.name, sector = %actor.sector, "下发被拒绝: 部门不可维护准备队列");
            return Err(ApiError::PermissionDenied {
                sector: actor.sector.clone(),
                target: "dispatch".to_string(),
            });
        }

        let created = engine.dispatch_batch(queue.drafts().to_vec())?;
        let drained = queue.finalized_batch();
        info!(actor = %actor.name, count = drained.len(), "准备队列已下发");
        Ok(created)
    }

    /// 移动货物到目标状态
    pub fn move_cargo(
        &self,
        cargo_id: &str,
        target: &str,
        actor: &Actor,
        payload: Option<RationPayload>,
    ) -> ApiResult<Cargo> {
        Self::check_actor(actor)?;
        let mut engine = self.lock_engine()?;
        Ok(engine.apply_transition(cargo_id, target, actor, payload)?)
    }

    /// 饲料就绪,恢复装车
    pub fn resume_from_ration_wait(&self, cargo_id: &str, actor: &Actor) -> ApiResult<Cargo> {
        Self::check_actor(actor)?;
        let mut engine = self.lock_engine()?;
        Ok(engine.resume_from_ration_wait(cargo_id, actor)?)
    }

    /// 推进饲料需求生产状态
    pub fn advance_demand(
        &self,
        demand_id: &str,
        new_status: &str,
        actor: &Actor,
        note: Option<String>,
    ) -> ApiResult<RationDemand> {
        Self::check_actor(actor)?;
        let mut engine = self.lock_engine()?;
        Ok(engine.advance_demand(demand_id, new_status, actor, note)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询单个货物
    pub fn get_cargo(&self, cargo_id: &str) -> ApiResult<Cargo> {
        let engine = self.lock_engine()?;
        engine
            .cargo(cargo_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Cargo(id={})不存在", cargo_id)))
    }

    /// 部门可见的看板列
    ///
    /// 未登记的部门得到空看板
    pub fn board(&self, actor: &Actor) -> ApiResult<Vec<KanbanColumn>> {
        let engine = self.lock_engine()?;
        let visible = engine.permitted_view(actor);
        let cargos = engine.cargos();

        Ok(visible
            .into_iter()
            .map(|status| {
                let def = status_definition(status);
                KanbanColumn {
                    status,
                    label: def.label.to_string(),
                    ordinal: def.ordinal,
                    cargos: cargos
                        .iter()
                        .filter(|c| c.status == status)
                        .map(|c| (*c).clone())
                        .collect(),
                }
            })
            .collect())
    }

    /// 饲料需求列表 (可按生产状态过滤)
    pub fn list_demands(&self, status: Option<&str>) -> ApiResult<Vec<RationDemand>> {
        let filter = match status {
            Some(raw) => Some(
                FabricationStatus::parse(raw)
                    .ok_or_else(|| ApiError::InvalidStatus(raw.to_string()))?,
            ),
            None => None,
        };

        let engine = self.lock_engine()?;
        Ok(engine
            .demands()
            .list()
            .into_iter()
            .filter(|d| filter.map_or(true, |s| d.fabrication_status == s))
            .cloned()
            .collect())
    }

    /// 生成报表
    pub fn report(&self, filter: ReportFilter) -> ApiResult<KanbanReport> {
        let snapshot = self.snapshot()?;
        Ok(self.aggregator.report(
            &snapshot.cargo_records,
            &snapshot.ration_demands,
            filter,
            snapshot.taken_at,
        ))
    }

    // ==========================================
    // 快照
    // ==========================================

    /// 导出当前快照
    pub fn snapshot(&self) -> ApiResult<KanbanSnapshot> {
        let engine = self.lock_engine()?;
        Ok(engine.snapshot())
    }

    /// 保存快照到仓储
    ///
    /// # 返回
    /// - Ok(String): 快照 ID
    pub fn save_snapshot(&self) -> ApiResult<String> {
        let repo = self.require_repo()?;
        let snapshot = self.snapshot()?;
        Ok(repo.save(&snapshot)?)
    }

    /// 从仓储中最近的快照恢复
    ///
    /// # 返回
    /// - Ok(true): 已恢复
    /// - Ok(false): 仓储中没有快照,引擎保持原状
    pub fn restore_latest(&self) -> ApiResult<bool> {
        let repo = self.require_repo()?;
        let snapshot = match repo.load_latest()? {
            Some(s) => s,
            None => return Ok(false),
        };

        let mut engine = self.lock_engine()?;
        engine.restore(snapshot)?;
        info!("看板已从最近快照恢复");
        Ok(true)
    }

    fn require_repo(&self) -> ApiResult<&Arc<KanbanSnapshotRepository>> {
        self.snapshot_repo
            .as_ref()
            .ok_or_else(|| ApiError::InternalError("未配置快照仓储".to_string()))
    }
}
