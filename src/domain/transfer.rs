// ==========================================
// 血液配送收货系统 - 调拨收货 (Transfer Receipt)
// ==========================================
// 职责: 调拨单、来源设施、已选产品、调拨收货载荷
// ==========================================

use crate::domain::consequence::{ConsequenceType, ItemConsequenceDto};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// TransferOrder - 调拨单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOrder {
    pub id: i64,
    pub order_number: String,
    #[serde(default)]
    pub product_category_key: Option<String>,
    #[serde(default)]
    pub label_status: Option<String>,
    /// 发货（来源）设施
    pub location_id: i64,
    /// 日期或日期时间文本
    #[serde(default)]
    pub desire_shipping_date: Option<String>,
}

impl TransferOrder {
    /// 调拨日期（取文本前 10 位解析）
    pub fn transferred_on(&self) -> Option<NaiveDate> {
        let raw = self.desire_shipping_date.as_deref()?;
        NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginFacility {
    pub id: i64,
    pub name: String,
}

// ==========================================
// 产品选择
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProductCandidate {
    #[serde(rename = "id")]
    pub inventory_id: i64,
    pub unit_number: String,
    pub product_code: String,
    #[serde(default)]
    pub isbt_product_code: Option<String>,
    #[serde(default)]
    pub description_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTransferProduct {
    pub product: TransferProductCandidate,
    pub quarantine: bool,
}

// ==========================================
// 发货与收货记录（用于完整性检查）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    pub id: i64,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceiptItem {
    pub inventory_id: i64,
    pub unit_number: String,
    pub product_code: String,
    #[serde(default)]
    pub transfer_receipt_item_consequences: Vec<ItemConsequenceDto>,
}

/// 已创建的调拨收货单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub transfer_receipt_items: Vec<TransferReceiptItem>,
}

impl TransferReceipt {
    pub fn has_quarantine(&self) -> bool {
        self.transfer_receipt_items.iter().any(|item| {
            item.transfer_receipt_item_consequences
                .iter()
                .any(|c| c.item_consequence_type == ConsequenceType::Quarantine)
        })
    }
}

// ==========================================
// TransferReceiptSubmission - 调拨收货载荷
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceiptSubmission {
    pub order_id: i64,
    pub order_number: String,
    pub location_id: i64,
    pub temperature: Option<String>,
    pub total_transit_time: Option<String>,
    pub transit_start_date_time: Option<NaiveDateTime>,
    pub transit_end_date_time: Option<NaiveDateTime>,
    pub transit_timezone: Option<String>,
    pub transit_time_result_key: Option<String>,
    pub inspection_key: Option<String>,
    pub comments: Option<String>,
    pub transfer_receipt_items: Vec<TransferReceiptItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transferred_on_accepts_date_time_text() {
        let mut order = TransferOrder {
            id: 1,
            order_number: "TR-100".to_string(),
            product_category_key: None,
            label_status: Some("LABELED".to_string()),
            location_id: 9,
            desire_shipping_date: Some("2024-06-03T10:00:00Z".to_string()),
        };
        assert_eq!(order.transferred_on(), NaiveDate::from_ymd_opt(2024, 6, 3));

        order.desire_shipping_date = Some("bad".to_string());
        assert!(order.transferred_on().is_none());
    }

    #[test]
    fn test_receipt_quarantine_detection() {
        let json = r#"{"id":7,"transferReceiptItems":[
            {"inventoryId":1,"unitNumber":"W1","productCode":"E01","transferReceiptItemConsequences":[]},
            {"inventoryId":2,"unitNumber":"W2","productCode":"E02","transferReceiptItemConsequences":[
                {"itemConsequenceReasonKey":"temperature","itemConsequenceType":"QUARANTINE"}]}]}"#;
        let receipt: TransferReceipt = serde_json::from_str(json).unwrap();
        assert!(receipt.has_quarantine());
        assert_eq!(
            receipt.transfer_receipt_items[1].transfer_receipt_item_consequences[0].item_consequence_type,
            ConsequenceType::Quarantine
        );

        let outgoing = serde_json::to_value(&receipt.transfer_receipt_items[1]).unwrap();
        assert_eq!(
            outgoing["transferReceiptItemConsequences"][0]["itemConsequenceType"],
            "QUARANTINE"
        );
    }
}
