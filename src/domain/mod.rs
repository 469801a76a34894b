// ==========================================
// 饲料装车看板 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含持久化逻辑,不含引擎逻辑
// ==========================================

pub mod cargo;
pub mod ration_demand;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use cargo::{Cargo, DraftCargo, HistoryEvent, RationNeeded, RationPayload};
pub use ration_demand::{DemandHistoryEvent, RationDemand};
pub use snapshot::{KanbanSnapshot, SNAPSHOT_VERSION};
pub use types::{
    status_definition, Actor, CargoStatus, DemandPriority, FabricationStatus, FleetType,
    StatusDefinition, PIPELINE, SYSTEM_ACTOR,
};
