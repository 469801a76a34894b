// ==========================================
// 饲料装车看板 - 配置层
// ==========================================
// 职责: 看板运行参数与权限覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod kanban_config;

// 重导出核心配置管理器
pub use config_manager::ConfigManager;
pub use kanban_config::{config_keys, KanbanConfig};
