// ==========================================
// 饲料装车看板 - API 层
// ==========================================
// 职责: 对外业务接口,串行化写操作并统一错误
// ==========================================

pub mod error;
pub mod kanban_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use kanban_api::{KanbanApi, KanbanColumn};
