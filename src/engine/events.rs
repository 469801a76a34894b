// ==========================================
// 饲料装车看板 - 引擎层事件发布
// ==========================================
// 职责: 定义看板事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，外部 (报表/推送) 实现适配器
// 红线: 发布失败只记日志，不回滚已提交的状态
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 看板事件类型
// ==========================================

/// 看板事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KanbanEventType {
    /// 货物下发到看板
    CargoDispatched,
    /// 货物状态变更
    CargoStatusChanged,
    /// 饲料需求创建
    RationDemandCreated,
    /// 饲料需求生产状态推进
    RationDemandAdvanced,
}

impl KanbanEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            KanbanEventType::CargoDispatched => "CargoDispatched",
            KanbanEventType::CargoStatusChanged => "CargoStatusChanged",
            KanbanEventType::RationDemandCreated => "RationDemandCreated",
            KanbanEventType::RationDemandAdvanced => "RationDemandAdvanced",
        }
    }
}

/// 看板事件
///
/// 状态字段使用外部状态 ID (货物: awaiting-entry…, 需求: awaiting…)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanEvent {
    /// 实体 ID (货物或需求)
    pub entity_id: String,
    /// 事件类型
    pub event_type: KanbanEventType,
    /// 操作人
    pub actor: String,
    /// 变更前状态
    pub from_status: Option<String>,
    /// 变更后状态
    pub to_status: String,
    /// 发生时间
    pub occurred_at: DateTime<Utc>,
}

impl KanbanEvent {
    pub fn new(
        entity_id: &str,
        event_type: KanbanEventType,
        actor: &str,
        from_status: Option<&str>,
        to_status: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            from_status: from_status.map(str::to_string),
            to_status: to_status.to_string(),
            occurred_at,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 看板事件发布者 Trait
///
/// # 返回
/// - `Ok(task_id)`: 下游任务 ID（如果支持）或空字符串
/// - `Err`: 发布失败
pub trait KanbanEventPublisher: Send + Sync {
    fn publish(&self, event: KanbanEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl KanbanEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: KanbanEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - entity_id={}, event_type={}",
            event.entity_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn KanbanEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn KanbanEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn KanbanEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: KanbanEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - entity_id={}, event_type={}",
                    event.entity_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 发布事件，失败只记录告警
    pub fn publish_or_warn(&self, event: KanbanEvent) {
        let entity_id = event.entity_id.clone();
        let event_type = event.event_type;
        if let Err(e) = self.publish(event) {
            tracing::warn!(
                entity_id = %entity_id,
                event_type = event_type.as_str(),
                error = %e,
                "看板事件发布失败（状态已提交）"
            );
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for OptionalEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalEventPublisher")
            .field("configured", &self.is_configured())
            .finish()
    }
}
