// ==========================================
// 饲料装车看板 - 引擎层
// ==========================================
// 职责: 看板状态迁移、饲料需求生成、准备队列、报表聚合
// 红线: Engine 不拼 SQL, 时间只来自注入时钟
// ==========================================

pub mod clock;
pub mod error;
pub mod events;
pub mod kanban;
pub mod permission;
pub mod preparation;
pub mod ration_demand;
pub mod reporting;

// 重导出核心引擎
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use events::{
    KanbanEvent, KanbanEventPublisher, KanbanEventType, NoOpEventPublisher, OptionalEventPublisher,
};
pub use kanban::{KanbanEngine, RATION_AVAILABLE_NOTE};
pub use permission::{
    PermissionOracle, SectorPermissionOracle, SECTOR_GATEHOUSE, SECTOR_LOGISTICS, SECTOR_SHIPPING,
};
pub use preparation::{DraftUpdate, PreparationQueue};
pub use ration_demand::RationDemandGenerator;
pub use reporting::{
    CycleWindow, DemandBoard, DistributionEntry, KanbanReport, KpiSummary, ReportFilter,
    ReportingAggregator, StatusTimeEntry,
};
