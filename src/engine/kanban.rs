// ==========================================
// 饲料装车看板 - 看板状态迁移引擎
// ==========================================
// 职责: 拥有货物当前状态、只追加历史、按状态累计时长; 校验并执行迁移
// 红线: 迁移要么整体生效,要么零变更 (先校验、后构造、最后提交)
// 红线: 进入等待饲料时,货物指针与新需求同时生成,不允许半生成
// 红线: "当前时间" 只来自注入的 Clock
// ==========================================

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::cargo::{Cargo, DraftCargo, HistoryEvent, RationNeeded, RationPayload};
use crate::domain::ration_demand::RationDemand;
use crate::domain::snapshot::{KanbanSnapshot, SNAPSHOT_VERSION};
use crate::domain::types::{Actor, CargoStatus, SYSTEM_ACTOR};
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{KanbanEvent, KanbanEventType, OptionalEventPublisher};
use crate::engine::permission::PermissionOracle;
use crate::engine::ration_demand::RationDemandGenerator;

/// 饲料就绪恢复装车时写入历史的备注
pub const RATION_AVAILABLE_NOTE: &str = "ration available";

// ==========================================
// KanbanEngine
// ==========================================
pub struct KanbanEngine {
    cargos: BTreeMap<String, Cargo>,
    demands: RationDemandGenerator,
    permissions: Arc<dyn PermissionOracle>,
    clock: Arc<dyn Clock>,
    publisher: OptionalEventPublisher,
}

impl KanbanEngine {
    /// 创建空引擎
    ///
    /// # 参数
    /// - permissions: 部门权限预言机
    /// - clock: 时间源
    pub fn new(permissions: Arc<dyn PermissionOracle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cargos: BTreeMap::new(),
            demands: RationDemandGenerator::new(),
            permissions,
            clock,
            publisher: OptionalEventPublisher::none(),
        }
    }

    /// 设置事件发布者
    pub fn with_publisher(mut self, publisher: OptionalEventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    /// 当前时间 (来自注入时钟)
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ==========================================
    // 下发 (准备队列 → 看板)
    // ==========================================

    /// 下发一批草稿到看板
    ///
    /// 初始状态: 自有车队 → awaiting-loading, 其余 → awaiting-entry
    /// 历史种子: 一条下发时刻的 system 事件
    ///
    /// # 返回
    /// - Ok(Vec<Cargo>): 新建的看板货物（保持批次顺序）
    /// - Err(ValidationError): 空批次/重复 ID/字段非法,整批不生效
    pub fn dispatch_batch(&mut self, batch: Vec<DraftCargo>) -> EngineResult<Vec<Cargo>> {
        if batch.is_empty() {
            return Err(EngineError::validation("下发批次为空"));
        }

        let mut seen = HashSet::new();
        for draft in &batch {
            if draft.id.trim().is_empty() {
                return Err(EngineError::validation("草稿 ID 不能为空"));
            }
            if !seen.insert(draft.id.as_str()) || self.cargos.contains_key(&draft.id) {
                return Err(EngineError::validation(format!(
                    "货物 {} 已下发或批次内重复",
                    draft.id
                )));
            }
            if draft.romaneio.trim().is_empty() {
                return Err(EngineError::validation(format!(
                    "货物 {} 装车单号不能为空",
                    draft.id
                )));
            }
            if !(draft.weight_kg > 0.0) {
                return Err(EngineError::validation(format!(
                    "货物 {} 重量必须大于 0",
                    draft.id
                )));
            }
        }

        let now = self.clock.now();
        let created: Vec<Cargo> = batch
            .into_iter()
            .map(|draft| Cargo::from_draft(draft, now, SYSTEM_ACTOR))
            .collect();

        for cargo in &created {
            self.cargos.insert(cargo.id.clone(), cargo.clone());
            self.publisher.publish_or_warn(KanbanEvent::new(
                &cargo.id,
                KanbanEventType::CargoDispatched,
                SYSTEM_ACTOR,
                None,
                cargo.status.as_str(),
                now,
            ));
        }

        info!(count = created.len(), at = %now, "货物批次已下发到看板");
        Ok(created)
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    /// 执行状态迁移
    ///
    /// 非线性流程: 权限集合内的任何状态都可直接到达（跳跃与回退均可）
    ///
    /// # 参数
    /// - cargo_id: 货物 ID
    /// - target: 目标状态 ID
    /// - actor: 操作人（部门决定权限）
    /// - payload: 进入 awaiting-ration 时必填的饲料载荷
    ///
    /// # 错误
    /// - NotFound: 货物不存在
    /// - InvalidStatus: 目标不是流程状态
    /// - PermissionDenied: 目标不在部门权限集合内
    /// - ValidationError: 目标等于当前状态,或饲料载荷缺失/非法
    pub fn apply_transition(
        &mut self,
        cargo_id: &str,
        target: &str,
        actor: &Actor,
        payload: Option<RationPayload>,
    ) -> EngineResult<Cargo> {
        self.transition(cargo_id, target, actor, payload, None)
    }

    /// 饲料就绪,恢复装车
    ///
    /// 只对 awaiting-ration 中的货物生效; 目标固定为 loading,
    /// status_before_ration 仅作记录,不决定恢复目标
    ///
    /// # 错误
    /// - NotFound: 货物不存在
    /// - ValidationError: 货物不在 awaiting-ration（先于权限检查）
    /// - 其余同 apply_transition
    pub fn resume_from_ration_wait(&mut self, cargo_id: &str, actor: &Actor) -> EngineResult<Cargo> {
        let cargo = self
            .cargos
            .get(cargo_id)
            .ok_or_else(|| EngineError::not_found("Cargo", cargo_id))?;
        if cargo.status != CargoStatus::AwaitingRation {
            warn!(cargo_id, status = %cargo.status, "恢复装车被拒绝: 货物不在等待饲料");
            return Err(EngineError::validation(format!(
                "货物 {} 处于 {},不在 awaiting-ration",
                cargo_id, cargo.status
            )));
        }

        self.transition(
            cargo_id,
            CargoStatus::Loading.as_str(),
            actor,
            None,
            Some(RATION_AVAILABLE_NOTE.to_string()),
        )
    }

    fn transition(
        &mut self,
        cargo_id: &str,
        target: &str,
        actor: &Actor,
        payload: Option<RationPayload>,
        note: Option<String>,
    ) -> EngineResult<Cargo> {
        // === 步骤 1: 校验（不产生任何变更）===
        let cargo = self
            .cargos
            .get(cargo_id)
            .ok_or_else(|| EngineError::not_found("Cargo", cargo_id))?;

        let target_status = CargoStatus::parse(target).ok_or_else(|| {
            warn!(cargo_id, target, "未知的看板状态");
            EngineError::InvalidStatus(target.to_string())
        })?;

        let permitted = self
            .permissions
            .permitted_targets(&actor.sector, cargo.status);
        if !permitted.contains(&target_status) {
            warn!(
                cargo_id,
                sector = %actor.sector,
                actor = %actor.name,
                target = %target_status,
                "迁移被拒绝: 部门无权限"
            );
            return Err(EngineError::permission_denied(&actor.sector, target));
        }

        if target_status == cargo.status {
            return Err(EngineError::validation(format!(
                "货物 {} 已处于 {}",
                cargo_id, target_status
            )));
        }

        let ration_payload = if target_status == CargoStatus::AwaitingRation {
            let payload = payload.ok_or_else(|| {
                EngineError::validation("进入 awaiting-ration 必须提供饲料载荷")
            })?;
            payload.validate().map_err(EngineError::ValidationError)?;
            Some(payload.normalized())
        } else {
            None
        };

        let prev = cargo
            .last_event()
            .cloned()
            .ok_or_else(|| EngineError::validation(format!("货物 {} 历史为空", cargo_id)))?;

        // === 步骤 2: 计算时间 ===
        let now = self.clock.now();
        let now = if now < prev.timestamp {
            warn!(cargo_id, %now, last = %prev.timestamp, "时钟早于最后事件,已钳制");
            prev.timestamp
        } else {
            now
        };
        let elapsed_ms = (now - prev.timestamp).num_milliseconds();

        // === 步骤 3: 构造新状态 ===
        let mut updated = cargo.clone();
        *updated.durations_ms.entry(prev.status).or_insert(0) += elapsed_ms;
        updated.history.push(HistoryEvent {
            status: target_status,
            timestamp: now,
            actor: actor.name.clone(),
            note,
        });
        updated.status = target_status;

        if prev.status == CargoStatus::AwaitingRation {
            // 离开等待饲料: 只清指针,需求保持不变
            updated.ration_needed = None;
            updated.status_before_ration = None;
        }

        // === 步骤 4: 跨实体副作用（需求创建在提交货物之前,失败则整体无变更）===
        let created_demand = match ration_payload {
            Some(payload) => {
                let demand = self.demands.create_demand(cargo, &payload, now)?;
                updated.ration_needed = Some(RationNeeded {
                    payload,
                    demand_id: demand.id.clone(),
                });
                updated.status_before_ration = Some(prev.status);
                Some(demand)
            }
            None => None,
        };

        // === 步骤 5: 提交 ===
        self.cargos.insert(updated.id.clone(), updated.clone());

        info!(
            cargo_id,
            from = %prev.status,
            to = %target_status,
            actor = %actor.name,
            sector = %actor.sector,
            elapsed_ms,
            "货物状态已迁移"
        );

        self.publisher.publish_or_warn(KanbanEvent::new(
            cargo_id,
            KanbanEventType::CargoStatusChanged,
            &actor.name,
            Some(prev.status.as_str()),
            target_status.as_str(),
            now,
        ));
        if let Some(demand) = &created_demand {
            self.publisher.publish_or_warn(KanbanEvent::new(
                &demand.id,
                KanbanEventType::RationDemandCreated,
                SYSTEM_ACTOR,
                None,
                demand.fabrication_status.as_str(),
                now,
            ));
        }

        Ok(updated)
    }

    // ==========================================
    // 饲料需求 (PCP 侧)
    // ==========================================

    /// 推进饲料需求生产状态（与货物迁移无时间耦合）
    pub fn advance_demand(
        &mut self,
        demand_id: &str,
        new_status: &str,
        actor: &Actor,
        note: Option<String>,
    ) -> EngineResult<RationDemand> {
        let now = self.clock.now();
        let before = self
            .demands
            .get(demand_id)
            .map(|d| d.fabrication_status);
        let demand = self
            .demands
            .advance_demand(demand_id, new_status, &actor.name, note, now)?;

        self.publisher.publish_or_warn(KanbanEvent::new(
            &demand.id,
            KanbanEventType::RationDemandAdvanced,
            &actor.name,
            before.map(|s| s.as_str()),
            demand.fabrication_status.as_str(),
            now,
        ));
        Ok(demand)
    }

    // ==========================================
    // 只读访问
    // ==========================================

    /// 按 ID 查询货物
    pub fn cargo(&self, cargo_id: &str) -> Option<&Cargo> {
        self.cargos.get(cargo_id)
    }

    /// 全部货物（按队列顺序,再按 ID）
    pub fn cargos(&self) -> Vec<&Cargo> {
        let mut all: Vec<&Cargo> = self.cargos.values().collect();
        all.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// 需求生成器（只读）
    pub fn demands(&self) -> &RationDemandGenerator {
        &self.demands
    }

    /// 部门可查看的状态列
    pub fn permitted_view(&self, actor: &Actor) -> BTreeSet<CargoStatus> {
        self.permissions.permitted_view(&actor.sector)
    }

    /// 部门是否可维护准备队列
    pub fn can_manage_queue(&self, actor: &Actor) -> bool {
        self.permissions.can_manage_queue(&actor.sector)
    }

    // ==========================================
    // 快照
    // ==========================================

    /// 导出快照
    pub fn snapshot(&self) -> KanbanSnapshot {
        KanbanSnapshot::new(
            self.clock.now(),
            self.cargos().into_iter().cloned().collect(),
            self.demands.list().into_iter().cloned().collect(),
        )
    }

    /// 从快照恢复（整体替换,校验失败时引擎保持原状）
    pub fn restore(&mut self, snapshot: KanbanSnapshot) -> EngineResult<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::validation(format!(
                "不支持的快照版本: {}",
                snapshot.version
            )));
        }

        let mut demand_ids = HashSet::new();
        for demand in &snapshot.ration_demands {
            demand.check_invariants().map_err(EngineError::ValidationError)?;
            if !demand_ids.insert(demand.id.as_str()) {
                return Err(EngineError::validation(format!("需求 ID 重复: {}", demand.id)));
            }
        }

        let mut cargo_ids = HashSet::new();
        for cargo in &snapshot.cargo_records {
            cargo.check_invariants().map_err(EngineError::ValidationError)?;
            if !cargo_ids.insert(cargo.id.as_str()) {
                return Err(EngineError::validation(format!("货物 ID 重复: {}", cargo.id)));
            }
            if let Some(needed) = &cargo.ration_needed {
                let linked = snapshot
                    .ration_demands
                    .iter()
                    .find(|d| d.id == needed.demand_id);
                match linked {
                    Some(d) if d.cargo_id == cargo.id => {}
                    _ => {
                        return Err(EngineError::validation(format!(
                            "货物 {} 引用的需求 {} 不存在或不属于该货物",
                            cargo.id, needed.demand_id
                        )))
                    }
                }
            }
        }

        let cargo_count = snapshot.cargo_records.len();
        let demand_count = snapshot.ration_demands.len();
        self.cargos = snapshot
            .cargo_records
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        self.demands.replace_all(snapshot.ration_demands);

        debug!(cargo_count, demand_count, "引擎已从快照恢复");
        Ok(())
    }
}
