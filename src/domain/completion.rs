// ==========================================
// 血液配送收货系统 - 完成提交与进度 (Completion)
// ==========================================
// 职责: 提交载荷 (ImportSubmission)、完成状态、进度快照
// ==========================================

use crate::domain::batch::ItemAttribute;
use crate::domain::consequence::{ConsequenceType, ItemConsequenceDto};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 提交时每个产品的初始状态
pub const PENDING_ITEM_STATUS: &str = "PENDING";

// ==========================================
// CompletionState - 完成状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionState {
    InProgress,
    Completed,
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionState::InProgress => write!(f, "IN_PROGRESS"),
            CompletionState::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionFailure {
    pub unit_number: Option<String>,
    pub product_code: Option<String>,
    pub reason: Option<String>,
}

// ==========================================
// CompletionStatus - 轮询返回的完成状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    pub total_items: u32,
    pub total_success: u32,
    pub total_failure: u32,
    #[serde(default)]
    pub failures: Vec<CompletionFailure>,
    pub status: CompletionState,
}

impl CompletionStatus {
    /// 已处理数 = 成功 + 失败
    pub fn processed(&self) -> u32 {
        self.total_success.saturating_add(self.total_failure)
    }

    pub fn is_terminal(&self) -> bool {
        self.status == CompletionState::Completed
    }
}

/// 提交成功后返回的完成标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTicket {
    pub id: i64,
}

// ==========================================
// ProgressSnapshot - 进度框显示数据
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub quantity: u32,
    pub processed: u32,
    pub failures: Vec<CompletionFailure>,
    /// 仅终态后允许关闭
    pub can_close: bool,
}

impl From<&CompletionStatus> for ProgressSnapshot {
    fn from(status: &CompletionStatus) -> Self {
        Self {
            quantity: status.total_items,
            processed: status.processed(),
            failures: status.failures.clone(),
            can_close: status.is_terminal(),
        }
    }
}

// ==========================================
// ImportSubmission - 进口完成提交载荷
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSubmission {
    pub location_id: i64,
    pub temperature: Option<String>,
    pub comments: Option<String>,
    pub product_category: Option<String>,
    pub shipment_inspect_key: Option<String>,
    pub total_transit_time: Option<String>,
    pub transit_start_date_time: Option<NaiveDateTime>,
    pub transit_end_date_time: Option<NaiveDateTime>,
    pub transit_timezone: Option<String>,
    pub transit_time_result_key: Option<String>,
    pub import_items: Vec<ImportSubmissionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSubmissionItem {
    pub unit_number: String,
    pub product_code: String,
    pub blood_type: Option<String>,
    /// QUARANTINE / RETURN_TO_INVENTORY
    pub product_consequence_key: ConsequenceType,
    pub license_status: Option<String>,
    pub expiration_date: NaiveDate,
    /// 仅许可产品携带
    pub license_number: Option<String>,
    pub registration_number: Option<String>,
    pub status: String,
    pub patient_id: Option<i64>,
    pub import_item_attributes: Vec<ItemAttribute>,
    pub import_item_consequences: Vec<ItemConsequenceDto>,
}
