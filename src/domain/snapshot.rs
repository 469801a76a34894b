// ==========================================
// 饲料装车看板 - 引擎快照
// ==========================================
// 用途: 外部持久化 (快照仓储) 与恢复
// 说明: 历史与时长台账随快照保存,恢复时不重算
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cargo::Cargo;
use crate::domain::ration_demand::RationDemand;

/// 当前快照格式版本
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub cargo_records: Vec<Cargo>,
    pub ration_demands: Vec<RationDemand>,
}

impl KanbanSnapshot {
    pub fn new(
        taken_at: DateTime<Utc>,
        cargo_records: Vec<Cargo>,
        ration_demands: Vec<RationDemand>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            taken_at,
            cargo_records,
            ration_demands,
        }
    }

    /// 空快照
    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self::new(taken_at, Vec::new(), Vec::new())
    }
}
