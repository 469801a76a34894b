// ==========================================
// 饲料装车看板 - 饲料需求生成器
// ==========================================
// 职责: 创建/推进 RationDemand（生产计划 PCP 驱动）
// 红线: 需求由生成器独占; 货物只保存需求 ID
// 红线: 需求不随货物离开等待饲料而删除或修改
// ==========================================

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::domain::cargo::{Cargo, RationPayload};
use crate::domain::ration_demand::{DemandHistoryEvent, RationDemand};
use crate::domain::types::{FabricationStatus, SYSTEM_ACTOR};
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// RationDemandGenerator
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RationDemandGenerator {
    demands: BTreeMap<String, RationDemand>,
}

impl RationDemandGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为货物的一次等待饲料创建需求
    ///
    /// # 参数
    /// - cargo: 来源货物（迁移前状态,用于记录 origin_cargo_status）
    /// - payload: 饲料载荷
    /// - now: 创建时间
    ///
    /// # 返回
    /// - Ok(RationDemand): 新需求（生产状态 awaiting,一条种子历史）
    /// - Err(ValidationError): 载荷非法,生成器状态不变
    pub fn create_demand(
        &mut self,
        cargo: &Cargo,
        payload: &RationPayload,
        now: DateTime<Utc>,
    ) -> EngineResult<RationDemand> {
        payload.validate().map_err(EngineError::ValidationError)?;
        let payload = payload.normalized();

        let demand = RationDemand {
            id: self.next_demand_id(&cargo.id),
            cargo_id: cargo.id.clone(),
            romaneio: cargo.romaneio.clone(),
            ration_name: payload.ration_name,
            ration_code: payload.ration_code,
            sack_count: payload.sack_count,
            priority: payload.priority,
            fabrication_status: FabricationStatus::Awaiting,
            note: payload.note,
            origin_cargo_status: cargo.status,
            created_at: now,
            updated_at: None,
            history: vec![DemandHistoryEvent {
                status: FabricationStatus::Awaiting,
                timestamp: now,
                actor: SYSTEM_ACTOR.to_string(),
                note: None,
            }],
        };

        info!(
            demand_id = %demand.id,
            cargo_id = %demand.cargo_id,
            ration = %demand.ration_name,
            sacks = demand.sack_count,
            priority = %demand.priority,
            "饲料需求已创建"
        );

        self.demands.insert(demand.id.clone(), demand.clone());
        Ok(demand)
    }

    /// 推进需求生产状态
    ///
    /// # 参数
    /// - demand_id: 需求 ID
    /// - new_status: 生产状态 ID（awaiting/manufacturing/bagging/available/delayed/cancelled）
    /// - actor: 操作人（生产计划）
    /// - note: 备注,非空时覆盖需求备注
    /// - now: 操作时间
    pub fn advance_demand(
        &mut self,
        demand_id: &str,
        new_status: &str,
        actor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<RationDemand> {
        let demand = self
            .demands
            .get_mut(demand_id)
            .ok_or_else(|| EngineError::not_found("RationDemand", demand_id))?;

        let status = FabricationStatus::parse(new_status).ok_or_else(|| {
            warn!(demand_id, new_status, "未知的生产状态");
            EngineError::InvalidStatus(new_status.to_string())
        })?;

        // 时钟回拨时钳制到最后一条历史,保证时间戳单调
        let last_ts = demand.last_event().map(|e| e.timestamp);
        let at = match last_ts {
            Some(last) if now < last => {
                warn!(demand_id, %now, %last, "时钟早于需求最后事件,已钳制");
                last
            }
            _ => now,
        };

        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let from = demand.fabrication_status;

        demand.history.push(DemandHistoryEvent {
            status,
            timestamp: at,
            actor: actor.to_string(),
            note: note.clone(),
        });
        demand.fabrication_status = status;
        if note.is_some() {
            demand.note = note;
        }
        demand.updated_at = Some(at);

        info!(
            demand_id,
            from = %from,
            to = %status,
            actor,
            "饲料需求生产状态已推进"
        );

        Ok(demand.clone())
    }

    /// 需求 ID: dem-<货物ID>-<该货物第 n 次等待饲料>
    ///
    /// 只由现有需求推导,相同状态下生成相同 ID
    fn next_demand_id(&self, cargo_id: &str) -> String {
        let mut n = self.demands.values().filter(|d| d.cargo_id == cargo_id).count() + 1;
        loop {
            let id = format!("dem-{}-{}", cargo_id, n);
            if !self.demands.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// 按 ID 查询
    pub fn get(&self, demand_id: &str) -> Option<&RationDemand> {
        self.demands.get(demand_id)
    }

    /// 全部需求（按创建时间,再按 ID）
    pub fn list(&self) -> Vec<&RationDemand> {
        let mut all: Vec<&RationDemand> = self.demands.values().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// 某货物产生过的全部需求
    pub fn for_cargo(&self, cargo_id: &str) -> Vec<&RationDemand> {
        self.list()
            .into_iter()
            .filter(|d| d.cargo_id == cargo_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// 用快照内容整体替换（调用方负责校验）
    pub(crate) fn replace_all(&mut self, demands: Vec<RationDemand>) {
        self.demands = demands.into_iter().map(|d| (d.id.clone(), d)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cargo::DraftCargo;
    use crate::domain::types::{CargoStatus, DemandPriority, FleetType};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn cargo() -> Cargo {
        Cargo::from_draft(
            DraftCargo {
                id: "C1".to_string(),
                romaneio: "ROM-001".to_string(),
                weight_kg: 1000.0,
                description: "Broiler feed".to_string(),
                fleet_type: FleetType::Owned,
                sequence: 1,
            },
            t0(),
            SYSTEM_ACTOR,
        )
    }

    #[test]
    fn test_create_demand_seeds_history() {
        let mut generator = RationDemandGenerator::new();
        let payload = RationPayload::new("  Starter Feed ", 10, DemandPriority::Normal);

        let demand = generator.create_demand(&cargo(), &payload, t0()).unwrap();

        assert_eq!(demand.id, "dem-C1-1");
        assert_eq!(demand.cargo_id, "C1");
        assert_eq!(demand.romaneio, "ROM-001");
        assert_eq!(demand.ration_name, "Starter Feed");
        assert_eq!(demand.fabrication_status, FabricationStatus::Awaiting);
        assert_eq!(demand.origin_cargo_status, CargoStatus::AwaitingLoading);
        assert_eq!(demand.history.len(), 1);
        assert_eq!(demand.history[0].actor, SYSTEM_ACTOR);
        assert_eq!(generator.len(), 1);
    }

    #[test]
    fn test_demand_ids_follow_cargo_sequence() {
        let mut generator = RationDemandGenerator::new();
        let payload = RationPayload::new("Starter Feed", 10, DemandPriority::Normal);

        let first = generator.create_demand(&cargo(), &payload, t0()).unwrap();
        let second = generator
            .create_demand(&cargo(), &payload, t0() + Duration::minutes(5))
            .unwrap();
        assert_eq!(first.id, "dem-C1-1");
        assert_eq!(second.id, "dem-C1-2");

        // 恢复进来的需求占用了编号时顺延
        let mut restored = RationDemandGenerator::new();
        let mut taken = first.clone();
        taken.id = "dem-C1-1".to_string();
        let mut other = first.clone();
        other.id = "dem-C1-2".to_string();
        other.cargo_id = "C9".to_string();
        restored.replace_all(vec![taken, other]);
        let next = restored.create_demand(&cargo(), &payload, t0()).unwrap();
        assert_eq!(next.id, "dem-C1-3");
    }

    #[test]
    fn test_create_demand_rejects_invalid_payload() {
        let mut generator = RationDemandGenerator::new();
        let payload = RationPayload::new("", 10, DemandPriority::Normal);

        let err = generator.create_demand(&cargo(), &payload, t0()).unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(_)));
        assert!(generator.is_empty());
    }

    #[test]
    fn test_advance_demand_appends_history() {
        let mut generator = RationDemandGenerator::new();
        let payload = RationPayload::new("Starter Feed", 10, DemandPriority::High);
        let demand = generator.create_demand(&cargo(), &payload, t0()).unwrap();

        let advanced = generator
            .advance_demand(
                &demand.id,
                "manufacturing",
                "pcp",
                Some("line 2".to_string()),
                t0() + Duration::minutes(30),
            )
            .unwrap();

        assert_eq!(advanced.fabrication_status, FabricationStatus::Manufacturing);
        assert_eq!(advanced.history.len(), 2);
        assert_eq!(advanced.note.as_deref(), Some("line 2"));
        assert_eq!(advanced.updated_at, Some(t0() + Duration::minutes(30)));

        // 空备注不覆盖原备注,但历史照常追加
        let advanced = generator
            .advance_demand(&demand.id, "bagging", "pcp", Some("  ".to_string()), t0() + Duration::minutes(50))
            .unwrap();
        assert_eq!(advanced.note.as_deref(), Some("line 2"));
        assert_eq!(advanced.history.len(), 3);
        assert!(advanced.history[2].note.is_none());
    }

    #[test]
    fn test_advance_demand_errors() {
        let mut generator = RationDemandGenerator::new();
        let payload = RationPayload::new("Starter Feed", 10, DemandPriority::Normal);
        let demand = generator.create_demand(&cargo(), &payload, t0()).unwrap();

        let err = generator
            .advance_demand("dem-missing", "bagging", "pcp", None, t0())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = generator
            .advance_demand(&demand.id, "shipped", "pcp", None, t0())
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidStatus("shipped".to_string()));

        // 失败不改变需求
        assert_eq!(generator.get(&demand.id).unwrap(), &demand);
    }

    #[test]
    fn test_advance_demand_clamps_backwards_clock() {
        let mut generator = RationDemandGenerator::new();
        let payload = RationPayload::new("Starter Feed", 10, DemandPriority::Normal);
        let demand = generator.create_demand(&cargo(), &payload, t0()).unwrap();

        let advanced = generator
            .advance_demand(&demand.id, "delayed", "pcp", None, t0() - Duration::minutes(5))
            .unwrap();
        assert_eq!(advanced.history[1].timestamp, t0());
    }
}
