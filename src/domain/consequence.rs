// ==========================================
// 血液配送收货系统 - 后果 (Consequence)
// ==========================================
// 来源: 表头校验规则（收货单级）/ 产品校验及退货历史（产品级）
// 只读: 从规则引擎收到后不再修改
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ConsequenceType - 后果类型
// ==========================================
// 未约定的类型以原文本保留，不参与隔离判定
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsequenceType {
    Quarantine,
    ReturnToInventory,
    Other(String),
}

impl ConsequenceType {
    pub fn as_str(&self) -> &str {
        match self {
            ConsequenceType::Quarantine => "QUARANTINE",
            ConsequenceType::ReturnToInventory => "RETURN_TO_INVENTORY",
            ConsequenceType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ConsequenceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "QUARANTINE" => ConsequenceType::Quarantine,
            "RETURN_TO_INVENTORY" => ConsequenceType::ReturnToInventory,
            _ => ConsequenceType::Other(s),
        }
    }
}

impl From<ConsequenceType> for String {
    fn from(t: ConsequenceType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ConsequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Consequence - 规则后果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consequence {
    pub consequence_type: ConsequenceType,
    #[serde(default)]
    pub consequence_reason_key: String,
    /// 触发该后果的表头字段（如目检字段）
    #[serde(default)]
    pub result_property: Option<String>,
}

impl Consequence {
    pub fn new(consequence_type: ConsequenceType, reason_key: &str) -> Self {
        Self {
            consequence_type,
            consequence_reason_key: reason_key.to_string(),
            result_property: None,
        }
    }

    pub fn with_result_property(mut self, property: &str) -> Self {
        self.result_property = Some(property.to_string());
        self
    }

    pub fn is_quarantine(&self) -> bool {
        self.consequence_type == ConsequenceType::Quarantine
    }
}

/// 提交载荷中的产品后果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConsequenceDto {
    pub item_consequence_reason_key: String,
    pub item_consequence_type: ConsequenceType,
}

impl From<&Consequence> for ItemConsequenceDto {
    fn from(c: &Consequence) -> Self {
        Self {
            item_consequence_reason_key: c.consequence_reason_key.clone(),
            item_consequence_type: c.consequence_type.clone(),
        }
    }
}
