// ==========================================
// 饲料装车看板 - 领域类型定义
// ==========================================
// 依据: 看板流程 6 个固定状态 + 车队类型 + 饲料生产状态
// 红线: 状态集合为进程级常量,不可运行期修改
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 货物看板状态 (Cargo Status)
// ==========================================
// 序列化格式: kebab-case (与快照/外部接口一致)
// 声明顺序即流程顺序 (Ord 依赖此顺序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CargoStatus {
    AwaitingEntry,   // 等待进厂
    AwaitingLoading, // 等待装车
    Loading,         // 装车中
    AwaitingRation,  // 等待饲料
    Loaded,          // 已装车
    Invoiced,        // 已开票
}

impl CargoStatus {
    /// 全部状态 (按流程顺序)
    pub const ALL: [CargoStatus; 6] = [
        CargoStatus::AwaitingEntry,
        CargoStatus::AwaitingLoading,
        CargoStatus::Loading,
        CargoStatus::AwaitingRation,
        CargoStatus::Loaded,
        CargoStatus::Invoiced,
    ];

    /// 状态 ID (外部接口使用)
    pub fn as_str(&self) -> &'static str {
        match self {
            CargoStatus::AwaitingEntry => "awaiting-entry",
            CargoStatus::AwaitingLoading => "awaiting-loading",
            CargoStatus::Loading => "loading",
            CargoStatus::AwaitingRation => "awaiting-ration",
            CargoStatus::Loaded => "loaded",
            CargoStatus::Invoiced => "invoiced",
        }
    }

    /// 从状态 ID 解析,未知 ID 返回 None
    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == id.trim())
    }

    /// 在流程中的序号 (0 起)
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// 展示名称
    pub fn label(&self) -> &'static str {
        match self {
            CargoStatus::AwaitingEntry => "Awaiting Entry",
            CargoStatus::AwaitingLoading => "Awaiting Loading",
            CargoStatus::Loading => "Loading",
            CargoStatus::AwaitingRation => "Awaiting Ration",
            CargoStatus::Loaded => "Loaded",
            CargoStatus::Invoiced => "Invoiced",
        }
    }

    /// 是否为流程终点侧的完成状态 (已装车/已开票)
    pub fn is_completed(&self) -> bool {
        matches!(self, CargoStatus::Loaded | CargoStatus::Invoiced)
    }
}

impl fmt::Display for CargoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CargoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("未知的看板状态: {}", s))
    }
}

// ==========================================
// 状态定义 (Status Definition)
// ==========================================
// 用途: 看板列头展示,流程顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDefinition {
    pub id: CargoStatus,
    pub label: &'static str,
    pub ordinal: usize,
}

/// 标准流程 (进程级常量)
pub const PIPELINE: [StatusDefinition; 6] = [
    StatusDefinition { id: CargoStatus::AwaitingEntry, label: "Awaiting Entry", ordinal: 0 },
    StatusDefinition { id: CargoStatus::AwaitingLoading, label: "Awaiting Loading", ordinal: 1 },
    StatusDefinition { id: CargoStatus::Loading, label: "Loading", ordinal: 2 },
    StatusDefinition { id: CargoStatus::AwaitingRation, label: "Awaiting Ration", ordinal: 3 },
    StatusDefinition { id: CargoStatus::Loaded, label: "Loaded", ordinal: 4 },
    StatusDefinition { id: CargoStatus::Invoiced, label: "Invoiced", ordinal: 5 },
];

/// 查询状态定义
pub fn status_definition(status: CargoStatus) -> &'static StatusDefinition {
    &PIPELINE[status.ordinal()]
}

// ==========================================
// 车队类型 (Fleet Type)
// ==========================================
// 自有车队直接进入等待装车; 外包/自提需先进厂
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FleetType {
    Owned,      // 自有车队
    Contracted, // 外包车队
    Pickup,     // 客户自提
}

impl FleetType {
    pub const ALL: [FleetType; 3] = [FleetType::Owned, FleetType::Contracted, FleetType::Pickup];

    pub fn as_str(&self) -> &'static str {
        match self {
            FleetType::Owned => "owned",
            FleetType::Contracted => "contracted",
            FleetType::Pickup => "pickup",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == id.trim())
    }

    pub fn label(&self) -> &'static str {
        match self {
            FleetType::Owned => "Owned Fleet",
            FleetType::Contracted => "Contracted Fleet",
            FleetType::Pickup => "Customer Pickup",
        }
    }

    /// 下发看板时的初始状态
    pub fn initial_status(&self) -> CargoStatus {
        match self {
            FleetType::Owned => CargoStatus::AwaitingLoading,
            FleetType::Contracted | FleetType::Pickup => CargoStatus::AwaitingEntry,
        }
    }
}

impl fmt::Display for FleetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 饲料生产状态 (Fabrication Status)
// ==========================================
// 由生产计划 (PCP) 驱动,与货物状态解耦
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FabricationStatus {
    Awaiting,      // 等待生产
    Manufacturing, // 生产中
    Bagging,       // 装袋中
    Available,     // 可提货
    Delayed,       // 延误
    Cancelled,     // 已取消
}

impl FabricationStatus {
    pub const ALL: [FabricationStatus; 6] = [
        FabricationStatus::Awaiting,
        FabricationStatus::Manufacturing,
        FabricationStatus::Bagging,
        FabricationStatus::Available,
        FabricationStatus::Delayed,
        FabricationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FabricationStatus::Awaiting => "awaiting",
            FabricationStatus::Manufacturing => "manufacturing",
            FabricationStatus::Bagging => "bagging",
            FabricationStatus::Available => "available",
            FabricationStatus::Delayed => "delayed",
            FabricationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == id.trim())
    }

    pub fn label(&self) -> &'static str {
        match self {
            FabricationStatus::Awaiting => "Awaiting Fabrication",
            FabricationStatus::Manufacturing => "Manufacturing",
            FabricationStatus::Bagging => "Bagging",
            FabricationStatus::Available => "Available",
            FabricationStatus::Delayed => "Delayed",
            FabricationStatus::Cancelled => "Cancelled",
        }
    }

    /// 仍需生产 (计入待生产袋数)
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            FabricationStatus::Awaiting
                | FabricationStatus::Manufacturing
                | FabricationStatus::Bagging
                | FabricationStatus::Delayed
        )
    }
}

impl fmt::Display for FabricationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 需求优先级 (Demand Priority)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemandPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl DemandPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandPriority::Low => "low",
            DemandPriority::Normal => "normal",
            DemandPriority::High => "high",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id.trim() {
            "low" => Some(DemandPriority::Low),
            "normal" => Some(DemandPriority::Normal),
            "high" => Some(DemandPriority::High),
            _ => None,
        }
    }
}

impl fmt::Display for DemandPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 操作人 (Actor)
// ==========================================
// sector 决定权限集合 (由权限预言机解释)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub sector: String,
}

/// 系统操作人名称 (下发看板时的种子事件)
pub const SYSTEM_ACTOR: &str = "system";

impl Actor {
    pub fn new(name: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sector: sector.into(),
        }
    }

    /// 系统操作人
    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR, SYSTEM_ACTOR)
    }
}
