// ==========================================
// 饲料装车看板 - 看板配置项
// ==========================================
// 存储: config_kv 表 (scope_id='global'),缺失时使用默认值
// ==========================================

use serde::{Deserialize, Serialize};

/// 配置键
pub mod config_keys {
    // 班次周期 (18:00 → 18:00)
    pub const CYCLE_START_HOUR: &str = "kanban/cycle_start_hour";
    pub const CYCLE_WINDOW_COUNT: &str = "kanban/cycle_window_count";
    pub const CYCLE_TARGET_TONNES: &str = "kanban/cycle_target_tonnes";
    pub const CYCLE_UTC_OFFSET_MINUTES: &str = "kanban/cycle_utc_offset_minutes";

    // 饲料
    pub const SACK_WEIGHT_KG: &str = "kanban/sack_weight_kg";

    // 权限覆写 (JSON: 部门 → 状态ID列表)
    pub const SECTOR_PERMISSIONS: &str = "kanban/sector_permissions";
}

/// 看板运行参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanConfig {
    /// 周期起始小时 (本地时间, 0..=23)
    pub cycle_start_hour: u32,
    /// 报表回看的周期数
    pub cycle_window_count: u32,
    /// 每周期吨位目标
    pub cycle_target_tonnes: f64,
    /// 本地时间相对 UTC 的偏移 (分钟)
    pub cycle_utc_offset_minutes: i32,
    /// 单袋重量 (kg)
    pub sack_weight_kg: f64,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            cycle_start_hour: 18,
            cycle_window_count: 7,
            cycle_target_tonnes: 50.0,
            cycle_utc_offset_minutes: -180,
            sack_weight_kg: 50.0,
        }
    }
}

impl KanbanConfig {
    /// 校验取值范围,返回失败原因
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_start_hour > 23 {
            return Err(format!("cycle_start_hour 超出范围: {}", self.cycle_start_hour));
        }
        if self.cycle_window_count == 0 {
            return Err("cycle_window_count 必须大于 0".to_string());
        }
        if !(self.cycle_target_tonnes.is_finite() && self.cycle_target_tonnes > 0.0) {
            return Err(format!(
                "cycle_target_tonnes 必须大于 0: {}",
                self.cycle_target_tonnes
            ));
        }
        if self.cycle_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(format!(
                "cycle_utc_offset_minutes 超出范围: {}",
                self.cycle_utc_offset_minutes
            ));
        }
        if !(self.sack_weight_kg.is_finite() && self.sack_weight_kg > 0.0) {
            return Err(format!("sack_weight_kg 必须大于 0: {}", self.sack_weight_kg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KanbanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cycle_start_hour, 18);
        assert_eq!(config.cycle_window_count, 7);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = KanbanConfig {
            cycle_start_hour: 24,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = KanbanConfig {
            cycle_utc_offset_minutes: 1440,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
