// ==========================================
// 血液配送收货系统 - 产品批次 (Batch)
// ==========================================
// 职责: 批次行项目、设施标识候选、患者、产品录入表单
// 红线: 行项目身份键 (unitNumber, productCode) 在批次内唯一
// ==========================================

use crate::domain::consequence::Consequence;
use crate::domain::lookup::LookupOption;
use crate::domain::shipment::ConditionalField;
use crate::domain::types::LicenseStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 产品属性键
pub mod attribute_keys {
    pub const LICENSE_STATUS: &str = "licenseStatus";
    pub const CMV_STATUS: &str = "cmvStatus";
    pub const HBS_NEGATIVE: &str = "hbsNegative";
}

// ==========================================
// ItemAttribute - 产品属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAttribute {
    pub property_key: String,
    pub property_value: AttributeValue,
}

impl ItemAttribute {
    pub fn text(key: &str, value: &str) -> Self {
        Self {
            property_key: key.to_string(),
            property_value: AttributeValue::Text(value.to_string()),
        }
    }

    pub fn flag(key: &str, value: bool) -> Self {
        Self {
            property_key: key.to_string(),
            property_value: AttributeValue::Flag(value),
        }
    }
}

// ==========================================
// FacilityIdentification - 来源设施标识候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityIdentification {
    pub id: i64,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ==========================================
// Patient - 患者
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub record_number: Option<String>,
}

// ==========================================
// BatchLineItem - 批次行项目
// ==========================================
// 由产品校验规则返回 (importItem[0])，追加时分配序号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLineItem {
    #[serde(default)]
    pub id: usize,
    pub unit_number: String,
    #[serde(default)]
    pub blood_type: Option<String>,
    pub isbt_product_code: String,
    pub expiration_date: NaiveDate,
    #[serde(default)]
    pub description_key: Option<String>,
    #[serde(default)]
    pub item_attributes: Vec<ItemAttribute>,
    #[serde(default)]
    pub facility_identification: Option<FacilityIdentification>,
    /// 规则要求关联患者
    #[serde(default)]
    pub patient_record: bool,
    #[serde(default)]
    pub patient: Option<Patient>,
    /// 退货历史后果
    #[serde(default)]
    pub return_item_consequences: Vec<Consequence>,
}

impl BatchLineItem {
    pub fn identity_key(&self) -> (&str, &str) {
        (self.unit_number.as_str(), self.isbt_product_code.as_str())
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.item_attributes
            .iter()
            .find(|a| a.property_key == key)
            .map(|a| &a.property_value)
    }

    pub fn license_status(&self) -> Option<LicenseStatus> {
        match self.attribute(attribute_keys::LICENSE_STATUS) {
            Some(AttributeValue::Text(s)) => LicenseStatus::from_str(s),
            _ => None,
        }
    }

    pub fn has_return_history(&self) -> bool {
        !self.return_item_consequences.is_empty()
    }

    /// 需要关联患者但尚未关联
    pub fn needs_patient(&self) -> bool {
        self.patient_record && self.patient.is_none()
    }
}

// ==========================================
// ProductScan - 一次完整的产品录入
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ProductScan {
    pub unit_number: String,
    pub blood_type: LookupOption,
    pub product_code: String,
    pub expiration_date: NaiveDate,
    pub license_status: LicenseStatus,
    pub cmv_status: Option<String>,
    pub hbs_negative: bool,
    pub registration_number: Option<String>,
}

impl ProductScan {
    pub fn new(
        unit_number: &str,
        blood_type: LookupOption,
        product_code: &str,
        expiration_date: NaiveDate,
    ) -> Self {
        Self {
            unit_number: unit_number.to_string(),
            blood_type,
            product_code: product_code.to_string(),
            expiration_date,
            license_status: LicenseStatus::default(),
            cmv_status: None,
            hbs_negative: false,
            registration_number: None,
        }
    }

    pub fn with_license_status(mut self, status: LicenseStatus) -> Self {
        self.license_status = status;
        self
    }

    pub fn with_cmv_status(mut self, status: &str) -> Self {
        self.cmv_status = Some(status.to_string());
        self
    }

    pub fn with_hbs_negative(mut self) -> Self {
        self.hbs_negative = true;
        self
    }

    pub fn with_registration_number(mut self, registration_number: &str) -> Self {
        self.registration_number = Some(registration_number.to_string());
        self
    }

    /// 产品属性：许可状态必带，CMV/HBs 仅在填写时附带
    pub fn attributes(&self) -> Vec<ItemAttribute> {
        let mut attributes = vec![ItemAttribute::text(
            attribute_keys::LICENSE_STATUS,
            self.license_status.as_str(),
        )];
        if let Some(cmv) = self.cmv_status.as_deref().filter(|s| !s.is_empty()) {
            attributes.push(ItemAttribute::text(attribute_keys::CMV_STATUS, cmv));
        }
        if self.hbs_negative {
            attributes.push(ItemAttribute::flag(attribute_keys::HBS_NEGATIVE, true));
        }
        attributes
    }
}

// ==========================================
// ProductEntryForm - 产品录入表单
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductEntryForm {
    pub unit_number: Option<String>,
    pub blood_type: Option<LookupOption>,
    pub product_code: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub license_status: LicenseStatus,
    pub cmv_status: Option<String>,
    pub hbs_negative: bool,
    pub registration_number: ConditionalField<String>,
}

impl ProductEntryForm {
    /// 载入一次录入（注册号需求状态不变）
    pub fn load(&mut self, scan: &ProductScan) {
        self.unit_number = Some(scan.unit_number.clone());
        self.blood_type = Some(scan.blood_type.clone());
        self.product_code = Some(scan.product_code.clone());
        self.expiration_date = Some(scan.expiration_date);
        self.license_status = scan.license_status;
        self.cmv_status = scan.cmv_status.clone();
        self.hbs_negative = scan.hbs_negative;
        if let Some(reg) = scan.registration_number.clone() {
            self.registration_number.fill(reg);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unit_number.as_deref().map_or(false, |s| !s.is_empty())
            && self.blood_type.is_some()
            && self.product_code.as_deref().map_or(false, |s| !s.is_empty())
            && self.expiration_date.is_some()
            && self.registration_number.is_satisfied()
    }

    /// 转为录入；表单不完整时返回 None
    pub fn to_scan(&self) -> Option<ProductScan> {
        if !self.is_complete() {
            return None;
        }
        Some(ProductScan {
            unit_number: self.unit_number.clone()?,
            blood_type: self.blood_type.clone()?,
            product_code: self.product_code.clone()?,
            expiration_date: self.expiration_date?,
            license_status: self.license_status,
            cmv_status: self.cmv_status.clone(),
            hbs_negative: self.hbs_negative,
            registration_number: self.registration_number.value().cloned(),
        })
    }

    /// 重置表单值
    ///
    /// keep_registration=true 时注册号字段保留为待填
    pub fn reset(&mut self, keep_registration: bool) {
        let mut registration_number = std::mem::take(&mut self.registration_number);
        if keep_registration {
            registration_number.clear();
        } else {
            registration_number.remove();
        }
        *self = Self {
            registration_number,
            ..Self::default()
        };
    }
}
