// ==========================================
// 血液配送收货系统 - 后果解析
// ==========================================
// 职责: 过滤隔离后果、判定目检不合格、产品后果标签、完成提示
// 说明: 纯数据分类，不含外部调用
// ==========================================

use crate::domain::batch::BatchLineItem;
use crate::domain::consequence::{Consequence, ConsequenceType, ItemConsequenceDto};
use crate::engine::events::messages;

/// 表头校验结果评估
#[derive(Debug, Clone, PartialEq)]
pub struct InfoAssessment {
    /// 收货单级隔离后果
    pub quarantine: Vec<Consequence>,
    pub inspection_failed: bool,
}

// ==========================================
// QuarantineSummary - 完成时的隔离汇总
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuarantineSummary {
    /// 收货单级隔离后果非空
    pub has_quarantine: bool,
    /// 存在带退货历史的产品
    pub has_item_quarantine: bool,
    /// 存在无退货历史的产品
    pub has_good_products: bool,
}

impl QuarantineSummary {
    /// 完成后的成功提示（两条可同时出现，隔离提示在前）
    pub fn completion_messages(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.has_quarantine || self.has_item_quarantine {
            out.push(messages::IMPORT_COMPLETE_QUARANTINE);
        }
        if self.has_good_products && !self.has_quarantine {
            out.push(messages::IMPORT_COMPLETE);
        }
        out
    }
}

// ==========================================
// ConsequenceResolver
// ==========================================
#[derive(Debug, Clone)]
pub struct ConsequenceResolver {
    inspection_result_property: String,
}

impl ConsequenceResolver {
    pub fn new(inspection_result_property: &str) -> Self {
        Self {
            inspection_result_property: inspection_result_property.to_string(),
        }
    }

    pub fn quarantine_consequences(&self, consequences: &[Consequence]) -> Vec<Consequence> {
        consequences
            .iter()
            .filter(|c| c.is_quarantine())
            .cloned()
            .collect()
    }

    /// 任一后果的 resultProperty 指向目检字段即判定不合格
    pub fn inspection_failed(&self, consequences: &[Consequence]) -> bool {
        consequences
            .iter()
            .any(|c| c.result_property.as_deref() == Some(self.inspection_result_property.as_str()))
    }

    pub fn assess(&self, consequences: &[Consequence]) -> InfoAssessment {
        let quarantine = self.quarantine_consequences(consequences);
        let inspection_failed = self.inspection_failed(&quarantine);
        InfoAssessment {
            quarantine,
            inspection_failed,
        }
    }

    pub fn summarize(shipment_consequences: &[Consequence], items: &[BatchLineItem]) -> QuarantineSummary {
        QuarantineSummary {
            has_quarantine: !shipment_consequences.is_empty(),
            has_item_quarantine: items.iter().any(BatchLineItem::has_return_history),
            has_good_products: items.iter().any(|i| !i.has_return_history()),
        }
    }

    /// 产品后果标签
    pub fn item_consequence_type(item: &BatchLineItem, shipment_quarantined: bool) -> ConsequenceType {
        if item.has_return_history() || shipment_quarantined {
            ConsequenceType::Quarantine
        } else {
            ConsequenceType::ReturnToInventory
        }
    }

    /// 提交载荷的产品后果 = 收货单后果 ++ 退货历史后果
    pub fn item_consequences(
        shipment_consequences: &[Consequence],
        item: &BatchLineItem,
    ) -> Vec<ItemConsequenceDto> {
        shipment_consequences
            .iter()
            .chain(item.return_item_consequences.iter())
            .map(ItemConsequenceDto::from)
            .collect()
    }
}
