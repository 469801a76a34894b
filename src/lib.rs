// ==========================================
// 饲料装车看板 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 货物生命周期状态机 + 时间台账 + 饲料需求
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 快照持久化
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    Actor, CargoStatus, DemandPriority, FabricationStatus, FleetType, StatusDefinition, PIPELINE,
};

// 领域实体
pub use domain::{Cargo, DraftCargo, HistoryEvent, KanbanSnapshot, RationDemand, RationPayload};

// 引擎
pub use engine::{
    KanbanEngine, PreparationQueue, RationDemandGenerator, ReportingAggregator,
    SectorPermissionOracle,
};

// API
pub use api::{ApiError, ApiResult, KanbanApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "饲料装车看板";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
