// ==========================================
// 血液配送收货系统 - 规则结果类型化
// ==========================================
// 职责: 同一校验接口按规则返回不同形状的 results，
//       以规则种类为键解码为带标签的联合类型
// ==========================================

use crate::client::error::{ClientError, ClientResult};
use crate::client::rule_client::RuleResponse;
use crate::domain::batch::{BatchLineItem, FacilityIdentification};
use crate::domain::consequence::Consequence;
use crate::domain::transfer::TransferProductCandidate;
use serde::Deserialize;
use std::fmt;

// ==========================================
// RuleKind - 规则种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    ImportInformation,       // 进口表头校验
    AddProductToBatch,       // 进口产品加入批次
    TransferInformation,     // 调拨表头校验
    TransferEligibility,     // 调拨单号资格评估
    TransferProductSelected, // 调拨产品选择校验
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::ImportInformation => "IMPORT_INFORMATION",
            RuleKind::AddProductToBatch => "ADD_PRODUCT_TO_BATCH",
            RuleKind::TransferInformation => "TRANSFER_INFORMATION",
            RuleKind::TransferEligibility => "TRANSFER_ELIGIBILITY",
            RuleKind::TransferProductSelected => "TRANSFER_PRODUCT_SELECTED",
        };
        write!(f, "{}", name)
    }
}

// ==========================================
// 各规则的结果形状
// ==========================================

/// 表头校验结果: { consequences[] }
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsequenceResults {
    pub consequences: Vec<Consequence>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDescription {
    pub description_key: Option<String>,
}

/// 产品加入批次结果: { importItem[], product[], importFacilityIdentification[][] }
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddProductResults {
    pub import_item: Vec<BatchLineItem>,
    pub product: Vec<ProductDescription>,
    pub import_facility_identification: Vec<Vec<FacilityIdentification>>,
}

impl AddProductResults {
    /// 候选设施列表（取第一组）
    pub fn facility_candidates(&self) -> &[FacilityIdentification] {
        self.import_facility_identification
            .first()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn description_key(&self) -> Option<&str> {
        self.product.first().and_then(|p| p.description_key.as_deref())
    }
}

/// 调拨产品选择结果: { inventory[], markForQuarantine[] }
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductSelectedResults {
    pub inventory: Vec<TransferProductCandidate>,
    pub mark_for_quarantine: Vec<bool>,
}

impl ProductSelectedResults {
    pub fn quarantine(&self) -> bool {
        self.mark_for_quarantine.first().copied().unwrap_or(false)
    }
}

// ==========================================
// RuleResults - 带标签的结果联合
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RuleResults {
    ImportInformation(ConsequenceResults),
    AddProductToBatch(AddProductResults),
    TransferInformation(ConsequenceResults),
    TransferEligibility,
    TransferProductSelected(ProductSelectedResults),
}

impl RuleKind {
    /// 按规则种类解码响应中的 results
    pub fn decode(self, response: &RuleResponse) -> ClientResult<RuleResults> {
        let results = match self {
            RuleKind::ImportInformation => {
                RuleResults::ImportInformation(response.decode_results()?)
            }
            RuleKind::AddProductToBatch => {
                RuleResults::AddProductToBatch(response.decode_results()?)
            }
            RuleKind::TransferInformation => {
                RuleResults::TransferInformation(response.decode_results()?)
            }
            RuleKind::TransferEligibility => RuleResults::TransferEligibility,
            RuleKind::TransferProductSelected => {
                RuleResults::TransferProductSelected(response.decode_results()?)
            }
        };
        Ok(results)
    }
}

impl RuleResults {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleResults::ImportInformation(_) => RuleKind::ImportInformation,
            RuleResults::AddProductToBatch(_) => RuleKind::AddProductToBatch,
            RuleResults::TransferInformation(_) => RuleKind::TransferInformation,
            RuleResults::TransferEligibility => RuleKind::TransferEligibility,
            RuleResults::TransferProductSelected(_) => RuleKind::TransferProductSelected,
        }
    }

    /// 表头校验的后果列表（进口/调拨通用）
    pub fn into_consequences(self) -> ClientResult<ConsequenceResults> {
        match self {
            RuleResults::ImportInformation(r) | RuleResults::TransferInformation(r) => Ok(r),
            other => Err(mismatch("consequences", other.kind())),
        }
    }

    pub fn into_add_product(self) -> ClientResult<AddProductResults> {
        match self {
            RuleResults::AddProductToBatch(r) => Ok(r),
            other => Err(mismatch("importItem", other.kind())),
        }
    }

    pub fn into_product_selected(self) -> ClientResult<ProductSelectedResults> {
        match self {
            RuleResults::TransferProductSelected(r) => Ok(r),
            other => Err(mismatch("inventory", other.kind())),
        }
    }
}

fn mismatch(expected: &str, actual: RuleKind) -> ClientError {
    ClientError::MalformedResponse(format!("期望结果 {}，实际规则种类 {}", expected, actual))
}
