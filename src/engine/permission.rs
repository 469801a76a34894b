// ==========================================
// 饲料装车看板 - 部门权限预言机
// ==========================================
// 职责: 部门 → 可查看/可移动的看板状态集合
// 说明: 引擎只把它当作布尔闸门,策略可替换
// ==========================================

use std::collections::{BTreeSet, HashMap};

use crate::domain::types::CargoStatus;

/// 物流部门 (全部状态 + 管理准备队列)
pub const SECTOR_LOGISTICS: &str = "logistics";
/// 门卫
pub const SECTOR_GATEHOUSE: &str = "gatehouse";
/// 发货/装车
pub const SECTOR_SHIPPING: &str = "shipping";

/// 权限预言机
pub trait PermissionOracle: Send + Sync {
    /// 当前状态下可移动到的目标状态
    fn permitted_targets(&self, sector: &str, current: CargoStatus) -> BTreeSet<CargoStatus>;

    /// 可查看的状态列
    fn permitted_view(&self, sector: &str) -> BTreeSet<CargoStatus>;

    /// 是否可维护准备队列并下发看板
    fn can_manage_queue(&self, sector: &str) -> bool;
}

// ==========================================
// SectorPermissionOracle - 静态部门权限表
// ==========================================
// 未登记的部门 → 空集合
#[derive(Debug, Clone)]
pub struct SectorPermissionOracle {
    sectors: HashMap<String, BTreeSet<CargoStatus>>,
    queue_managers: BTreeSet<String>,
}

impl SectorPermissionOracle {
    /// 标准权限表
    pub fn standard() -> Self {
        let mut sectors = HashMap::new();
        sectors.insert(
            SECTOR_LOGISTICS.to_string(),
            CargoStatus::ALL.iter().copied().collect(),
        );
        sectors.insert(
            SECTOR_GATEHOUSE.to_string(),
            [
                CargoStatus::AwaitingEntry,
                CargoStatus::AwaitingLoading,
                CargoStatus::Loaded,
                CargoStatus::Invoiced,
            ]
            .into_iter()
            .collect(),
        );
        sectors.insert(
            SECTOR_SHIPPING.to_string(),
            [
                CargoStatus::AwaitingLoading,
                CargoStatus::Loading,
                CargoStatus::Loaded,
            ]
            .into_iter()
            .collect(),
        );

        Self {
            sectors,
            queue_managers: [SECTOR_LOGISTICS.to_string()].into_iter().collect(),
        }
    }

    /// 从 部门 → 状态ID列表 构建 (用于配置覆写)
    ///
    /// # 返回
    /// - Err: 存在未知状态 ID
    pub fn from_map(map: &HashMap<String, Vec<String>>) -> Result<Self, String> {
        let mut sectors = HashMap::new();
        for (sector, ids) in map {
            let mut statuses = BTreeSet::new();
            for id in ids {
                let status = CargoStatus::parse(id)
                    .ok_or_else(|| format!("部门 {} 配置了未知状态: {}", sector, id))?;
                statuses.insert(status);
            }
            sectors.insert(sector.trim().to_string(), statuses);
        }

        Ok(Self {
            sectors,
            queue_managers: [SECTOR_LOGISTICS.to_string()].into_iter().collect(),
        })
    }

    /// 追加可维护准备队列的部门
    pub fn with_queue_manager(mut self, sector: &str) -> Self {
        self.queue_managers.insert(sector.to_string());
        self
    }

    fn statuses_for(&self, sector: &str) -> BTreeSet<CargoStatus> {
        self.sectors.get(sector).cloned().unwrap_or_default()
    }
}

impl Default for SectorPermissionOracle {
    fn default() -> Self {
        Self::standard()
    }
}

impl PermissionOracle for SectorPermissionOracle {
    // 与当前状态无关: 只看目标是否在部门集合内
    fn permitted_targets(&self, sector: &str, _current: CargoStatus) -> BTreeSet<CargoStatus> {
        self.statuses_for(sector)
    }

    fn permitted_view(&self, sector: &str) -> BTreeSet<CargoStatus> {
        self.statuses_for(sector)
    }

    fn can_manage_queue(&self, sector: &str) -> bool {
        self.queue_managers.contains(sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_gatehouse_cannot_load() {
        let oracle = SectorPermissionOracle::standard();
        let targets = oracle.permitted_targets(SECTOR_GATEHOUSE, CargoStatus::AwaitingEntry);

        assert!(targets.contains(&CargoStatus::AwaitingLoading));
        assert!(!targets.contains(&CargoStatus::Loading));
        assert!(!targets.contains(&CargoStatus::AwaitingRation));
    }

    #[test]
    fn test_logistics_sees_all_columns() {
        let oracle = SectorPermissionOracle::standard();
        assert_eq!(oracle.permitted_view(SECTOR_LOGISTICS).len(), 6);
        assert!(oracle.can_manage_queue(SECTOR_LOGISTICS));
        assert!(!oracle.can_manage_queue(SECTOR_SHIPPING));
    }

    #[test]
    fn test_unknown_sector_is_empty() {
        let oracle = SectorPermissionOracle::standard();
        assert!(oracle.permitted_view("visitor").is_empty());
        assert!(oracle
            .permitted_targets("visitor", CargoStatus::Loading)
            .is_empty());
    }

    #[test]
    fn test_from_map_rejects_unknown_status() {
        let mut map = HashMap::new();
        map.insert("weighbridge".to_string(), vec!["loaded".to_string(), "weighed".to_string()]);
        assert!(SectorPermissionOracle::from_map(&map).is_err());

        map.insert("weighbridge".to_string(), vec!["loaded".to_string()]);
        let oracle = SectorPermissionOracle::from_map(&map).unwrap();
        assert_eq!(
            oracle.permitted_view("weighbridge"),
            [CargoStatus::Loaded].into_iter().collect()
        );
    }
}
