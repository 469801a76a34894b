// ==========================================
// 饲料装车看板 - 引擎层错误类型
// ==========================================
// 红线: 所有失败均为调用方可修正的本地错误,失败时零部分变更
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 未知的货物/需求 ID
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    /// 目标不是合法的看板状态/生产状态
    #[error("无效的状态: {0}")]
    InvalidStatus(String),

    /// 操作人所在部门无权操作目标状态
    #[error("权限不足: sector={sector}, target={target}")]
    PermissionDenied { sector: String, target: String },

    /// 载荷缺失或非法
    #[error("数据验证失败: {0}")]
    ValidationError(String),
}

impl EngineError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn permission_denied(sector: &str, target: &str) -> Self {
        EngineError::PermissionDenied {
            sector: sector.to_string(),
            target: target.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::ValidationError(message.into())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
