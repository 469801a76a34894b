// ==========================================
// 饲料装车看板 - 饲料生产需求领域模型
// ==========================================
// 职责: RationDemand 实体及其独立历史
// 红线: 需求创建后生命周期与货物解耦,不随货物离开等待饲料而删除
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::{CargoStatus, DemandPriority, FabricationStatus};

// ==========================================
// DemandHistoryEvent - 生产状态变更事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandHistoryEvent {
    pub status: FabricationStatus,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ==========================================
// RationDemand - 饲料生产需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationDemand {
    pub id: String,
    pub cargo_id: String,           // 来源货物 (非拥有引用)
    pub romaneio: String,           // 来源装车单号 (冗余,便于 PCP 展示)
    pub ration_name: String,
    #[serde(default)]
    pub ration_code: Option<String>,
    pub sack_count: u32,
    pub priority: DemandPriority,
    pub fabrication_status: FabricationStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub origin_cargo_status: CargoStatus, // 货物进入等待饲料前的状态
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub history: Vec<DemandHistoryEvent>,
}

impl RationDemand {
    /// 最后一条历史事件
    pub fn last_event(&self) -> Option<&DemandHistoryEvent> {
        self.history.last()
    }

    /// 校验实体不变量 (用于快照恢复)
    pub fn check_invariants(&self) -> Result<(), String> {
        let last = self
            .history
            .last()
            .ok_or_else(|| format!("需求 {} 历史为空", self.id))?;
        if last.status != self.fabrication_status {
            return Err(format!(
                "需求 {} 当前状态 {} 与最后历史状态 {} 不一致",
                self.id, self.fabrication_status, last.status
            ));
        }
        if self
            .history
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(format!("需求 {} 历史时间戳倒序", self.id));
        }
        if self.sack_count == 0 {
            return Err(format!("需求 {} 袋数为 0", self.id));
        }
        Ok(())
    }
}
