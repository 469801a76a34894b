// ==========================================
// 饲料装车看板 - 货物领域模型
// ==========================================
// 职责: Cargo 实体、历史事件、时长台账、饲料需求载荷
// 红线: 历史只追加,不修改/不重排
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::types::{CargoStatus, DemandPriority, FleetType};

// ==========================================
// HistoryEvent - 状态变更事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub status: CargoStatus,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ==========================================
// RationPayload - 饲料需求载荷
// ==========================================
// 进入 awaiting-ration 时必须提供
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationPayload {
    pub ration_name: String,
    #[serde(default)]
    pub ration_code: Option<String>,
    pub sack_count: u32,
    #[serde(default)]
    pub priority: DemandPriority,
    #[serde(default)]
    pub note: Option<String>,
}

impl RationPayload {
    pub fn new(ration_name: impl Into<String>, sack_count: u32, priority: DemandPriority) -> Self {
        Self {
            ration_name: ration_name.into(),
            ration_code: None,
            sack_count,
            priority,
            note: None,
        }
    }

    /// 校验载荷,返回失败原因
    pub fn validate(&self) -> Result<(), String> {
        if self.ration_name.trim().is_empty() {
            return Err("饲料名称不能为空".to_string());
        }
        if self.sack_count == 0 {
            return Err("袋数必须大于 0".to_string());
        }
        Ok(())
    }

    /// 去除首尾空白后的副本
    pub fn normalized(&self) -> Self {
        Self {
            ration_name: self.ration_name.trim().to_string(),
            ration_code: self
                .ration_code
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            sack_count: self.sack_count,
            priority: self.priority,
            note: self
                .note
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    /// 预估吨位 (袋数 × 单袋重量)
    pub fn estimated_tonnes(&self, sack_weight_kg: f64) -> f64 {
        f64::from(self.sack_count) * sack_weight_kg / 1000.0
    }
}

// ==========================================
// RationNeeded - 货物上的饲料等待信息
// ==========================================
// demand_id 为非拥有引用 (需求由生成器独占)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationNeeded {
    pub payload: RationPayload,
    pub demand_id: String,
}

// ==========================================
// DraftCargo - 准备队列中的草稿
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftCargo {
    pub id: String,
    pub romaneio: String,   // 装车单号
    pub weight_kg: f64,     // 重量 (kg)
    pub description: String,
    pub fleet_type: FleetType,
    pub sequence: u32,      // 队列顺序 (1 起)
}

// ==========================================
// Cargo - 看板货物
// ==========================================
// 不变量:
// - history 非空,且最后一条的 status == status
// - history 时间戳单调不减
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub id: String,
    pub romaneio: String,
    pub weight_kg: f64,
    pub description: String,
    pub fleet_type: FleetType,
    pub sequence: u32,
    pub status: CargoStatus,
    pub dispatched_at: DateTime<Utc>,
    pub history: Vec<HistoryEvent>,
    /// 状态 → 累计毫秒
    pub durations_ms: BTreeMap<CargoStatus, i64>,
    #[serde(default)]
    pub ration_needed: Option<RationNeeded>,
    /// 进入等待饲料前的状态 (仅记录,恢复装车固定回到 loading)
    #[serde(default)]
    pub status_before_ration: Option<CargoStatus>,
}

impl Cargo {
    /// 由草稿创建看板货物 (下发时调用)
    pub fn from_draft(draft: DraftCargo, dispatched_at: DateTime<Utc>, actor: &str) -> Self {
        let status = draft.fleet_type.initial_status();
        Self {
            id: draft.id,
            romaneio: draft.romaneio,
            weight_kg: draft.weight_kg,
            description: draft.description,
            fleet_type: draft.fleet_type,
            sequence: draft.sequence,
            status,
            dispatched_at,
            history: vec![HistoryEvent {
                status,
                timestamp: dispatched_at,
                actor: actor.to_string(),
                note: None,
            }],
            durations_ms: BTreeMap::new(),
            ration_needed: None,
            status_before_ration: None,
        }
    }

    /// 最后一条历史事件
    pub fn last_event(&self) -> Option<&HistoryEvent> {
        self.history.last()
    }

    /// 第一条历史事件
    pub fn first_event(&self) -> Option<&HistoryEvent> {
        self.history.first()
    }

    /// 已关闭阶段累计时长 (毫秒)
    pub fn total_elapsed_ms(&self) -> i64 {
        self.durations_ms.values().sum()
    }

    /// 某状态累计时长 (毫秒)
    pub fn duration_in(&self, status: CargoStatus) -> i64 {
        self.durations_ms.get(&status).copied().unwrap_or(0)
    }

    /// 是否到访过某状态
    pub fn has_visited(&self, status: CargoStatus) -> bool {
        self.history.iter().any(|e| e.status == status)
    }

    /// 吨位
    pub fn weight_tonnes(&self) -> f64 {
        self.weight_kg / 1000.0
    }

    /// 校验实体不变量 (用于快照恢复)
    pub fn check_invariants(&self) -> Result<(), String> {
        let last = self
            .history
            .last()
            .ok_or_else(|| format!("货物 {} 历史为空", self.id))?;
        if last.status != self.status {
            return Err(format!(
                "货物 {} 当前状态 {} 与最后历史状态 {} 不一致",
                self.id, self.status, last.status
            ));
        }
        if self
            .history
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(format!("货物 {} 历史时间戳倒序", self.id));
        }
        if self.durations_ms.values().any(|ms| *ms < 0) {
            return Err(format!("货物 {} 时长台账存在负值", self.id));
        }
        // 台账守恒: 各状态累计之和 == 最后事件 - 首个事件
        let span_ms = self
            .history
            .first()
            .map(|first| (last.timestamp - first.timestamp).num_milliseconds())
            .unwrap_or(0);
        if self.total_elapsed_ms() != span_ms {
            return Err(format!(
                "货物 {} 时长台账合计 {}ms 与历史跨度 {}ms 不一致",
                self.id,
                self.total_elapsed_ms(),
                span_ms
            ));
        }
        if self.ration_needed.is_some() && self.status != CargoStatus::AwaitingRation {
            return Err(format!(
                "货物 {} 不在等待饲料状态却持有饲料需求",
                self.id
            ));
        }
        Ok(())
    }
}
