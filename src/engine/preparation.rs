// ==========================================
// 饲料装车看板 - 准备队列
// ==========================================
// 职责: 下发前的草稿列表 (新增/修改/删除/排序)
// 红线: sequence 始终为 1..n 连续编号
// 红线: finalized_batch 只交出一次,交出后队列为空
// ==========================================

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::cargo::DraftCargo;
use crate::domain::types::FleetType;
use crate::engine::error::{EngineError, EngineResult};

/// 草稿修改内容 (None 表示不修改)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftUpdate {
    pub romaneio: Option<String>,
    pub weight_kg: Option<f64>,
    pub description: Option<String>,
    pub fleet_type: Option<FleetType>,
}

#[derive(Debug, Clone, Default)]
pub struct PreparationQueue {
    drafts: Vec<DraftCargo>,
}

impl PreparationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增草稿 (追加到队尾)
    ///
    /// # 参数
    /// - romaneio: 装车单号,不能为空
    /// - weight_kg: 重量,必须大于 0
    /// - description: 描述,缺省为 "Cargo <装车单号>"
    /// - fleet_type: 车队类型
    pub fn add_draft(
        &mut self,
        romaneio: &str,
        weight_kg: f64,
        description: Option<String>,
        fleet_type: FleetType,
    ) -> EngineResult<DraftCargo> {
        let romaneio = validate_romaneio(romaneio)?;
        validate_weight(weight_kg)?;

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Cargo {}", romaneio));

        let draft = DraftCargo {
            id: format!("cargo-{}", Uuid::new_v4()),
            romaneio,
            weight_kg,
            description,
            fleet_type,
            sequence: self.drafts.len() as u32 + 1,
        };
        debug!(draft_id = %draft.id, sequence = draft.sequence, "草稿已加入准备队列");
        self.drafts.push(draft.clone());
        Ok(draft)
    }

    /// 修改草稿
    pub fn update_draft(&mut self, draft_id: &str, update: DraftUpdate) -> EngineResult<DraftCargo> {
        let romaneio = update.romaneio.as_deref().map(validate_romaneio).transpose()?;
        if let Some(weight_kg) = update.weight_kg {
            validate_weight(weight_kg)?;
        }

        let draft = self
            .drafts
            .iter_mut()
            .find(|d| d.id == draft_id)
            .ok_or_else(|| EngineError::not_found("DraftCargo", draft_id))?;

        if let Some(romaneio) = romaneio {
            draft.romaneio = romaneio;
        }
        if let Some(weight_kg) = update.weight_kg {
            draft.weight_kg = weight_kg;
        }
        if let Some(description) = update.description {
            let description = description.trim().to_string();
            draft.description = if description.is_empty() {
                format!("Cargo {}", draft.romaneio)
            } else {
                description
            };
        }
        if let Some(fleet_type) = update.fleet_type {
            draft.fleet_type = fleet_type;
        }
        Ok(draft.clone())
    }

    /// 删除草稿并重新编号
    pub fn remove_draft(&mut self, draft_id: &str) -> EngineResult<DraftCargo> {
        let idx = self
            .drafts
            .iter()
            .position(|d| d.id == draft_id)
            .ok_or_else(|| EngineError::not_found("DraftCargo", draft_id))?;
        let removed = self.drafts.remove(idx);
        self.renumber();
        Ok(removed)
    }

    /// 移动草稿位置 (from → to, 0 起) 并重新编号
    pub fn reorder(&mut self, from: usize, to: usize) -> EngineResult<()> {
        let len = self.drafts.len();
        if from >= len || to >= len {
            return Err(EngineError::validation(format!(
                "队列位置越界: from={}, to={}, len={}",
                from, to, len
            )));
        }
        let draft = self.drafts.remove(from);
        self.drafts.insert(to, draft);
        self.renumber();
        Ok(())
    }

    pub fn drafts(&self) -> &[DraftCargo] {
        &self.drafts
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// 交出当前批次并清空队列
    pub fn finalized_batch(&mut self) -> Vec<DraftCargo> {
        std::mem::take(&mut self.drafts)
    }

    fn renumber(&mut self) {
        for (idx, draft) in self.drafts.iter_mut().enumerate() {
            draft.sequence = idx as u32 + 1;
        }
    }
}

fn validate_romaneio(romaneio: &str) -> EngineResult<String> {
    let romaneio = romaneio.trim();
    if romaneio.is_empty() {
        return Err(EngineError::validation("装车单号不能为空"));
    }
    Ok(romaneio.to_string())
}

fn validate_weight(weight_kg: f64) -> EngineResult<()> {
    if weight_kg.is_finite() && weight_kg > 0.0 {
        Ok(())
    } else {
        Err(EngineError::validation(format!("重量必须大于 0: {}", weight_kg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(romaneios: &[&str]) -> PreparationQueue {
        let mut queue = PreparationQueue::new();
        for r in romaneios {
            queue.add_draft(r, 12_000.0, None, FleetType::Contracted).unwrap();
        }
        queue
    }

    #[test]
    fn test_add_draft_defaults() {
        let mut queue = PreparationQueue::new();
        let draft = queue
            .add_draft(" 4521 ", 30_000.0, None, FleetType::Owned)
            .unwrap();

        assert_eq!(draft.romaneio, "4521");
        assert_eq!(draft.description, "Cargo 4521");
        assert_eq!(draft.sequence, 1);
        assert!(queue.add_draft("", 1.0, None, FleetType::Owned).is_err());
        assert!(queue.add_draft("4522", 0.0, None, FleetType::Owned).is_err());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_reorder_renumbers() {
        let mut queue = queue_with(&["A", "B", "C"]);
        queue.reorder(2, 0).unwrap();

        let order: Vec<(&str, u32)> = queue
            .drafts()
            .iter()
            .map(|d| (d.romaneio.as_str(), d.sequence))
            .collect();
        assert_eq!(order, vec![("C", 1), ("A", 2), ("B", 3)]);
        assert!(queue.reorder(0, 3).is_err());
    }

    #[test]
    fn test_update_and_remove() {
        let mut queue = queue_with(&["A", "B"]);
        let id = queue.drafts()[0].id.clone();

        let updated = queue
            .update_draft(
                &id,
                DraftUpdate {
                    weight_kg: Some(8_000.0),
                    fleet_type: Some(FleetType::Pickup),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.weight_kg, 8_000.0);
        assert_eq!(updated.fleet_type, FleetType::Pickup);

        let bad = DraftUpdate {
            weight_kg: Some(-1.0),
            ..Default::default()
        };
        assert!(queue.update_draft(&id, bad).is_err());

        queue.remove_draft(&id).unwrap();
        assert_eq!(queue.drafts()[0].romaneio, "B");
        assert_eq!(queue.drafts()[0].sequence, 1);
        assert!(queue.remove_draft(&id).is_err());
    }

    #[test]
    fn test_finalized_batch_drains_once() {
        let mut queue = queue_with(&["A", "B"]);
        let batch = queue.finalized_batch();
        assert_eq!(batch.len(), 2);
        assert!(queue.is_empty());
        assert!(queue.finalized_batch().is_empty());
    }
}
