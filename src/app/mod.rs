// ==========================================
// 饲料装车看板 - 应用层
// ==========================================
// 职责: 装配各层,供入口程序使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
