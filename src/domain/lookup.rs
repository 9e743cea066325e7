// ==========================================
// 血液配送收货系统 - 字典数据 (Lookup)
// ==========================================
// 职责: 字典选项定义，按类型拆分为类别/检验/血型/时区
// 说明: 字典数据在向导进入时一次性提供，只读
// ==========================================

use serde::{Deserialize, Serialize};

/// 字典类型常量
pub mod lookup_types {
    pub const PRODUCT_CATEGORY: &str = "ORDER_PRODUCT_CATEGORY";
    pub const IMPORT_INSPECTION_STATUS: &str = "IMPORTS_INSPECTION_STATUS";
    pub const IMPORT_BLOOD_TYPES: &str = "IMPORTS_BLOOD_TYPES";
    pub const IMPORT_TRANSIT_TIME_ZONE: &str = "IMPORTS_TRANSIT_TIME_ZONE";
    pub const TRANSFER_INSPECTION_STATUS: &str = "RETURNS_INSPECTION_STATUS";
    pub const TRANSFER_TRANSIT_TIME_ZONE: &str = "RETURNS_TRANSIT_TIME_ZONE";
}

fn default_active() -> bool {
    true
}

// ==========================================
// LookupOption - 字典选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOption {
    pub id: i64,
    #[serde(rename = "type")]
    pub lookup_type: String,
    pub option_value: String,
    pub description_key: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl LookupOption {
    pub fn new(id: i64, lookup_type: &str, option_value: &str, description_key: &str) -> Self {
        Self {
            id,
            lookup_type: lookup_type.to_string(),
            option_value: option_value.to_string(),
            description_key: description_key.to_string(),
            active: true,
        }
    }
}

// ==========================================
// LookupCatalog - 按类型拆分后的字典
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LookupCatalog {
    pub categories: Vec<LookupOption>,
    pub inspections: Vec<LookupOption>,
    pub blood_types: Vec<LookupOption>,
    pub time_zones: Vec<LookupOption>,
}

impl LookupCatalog {
    /// 进口收货字典
    pub fn for_imports(lookups: &[LookupOption]) -> Self {
        Self::split(
            lookups,
            lookup_types::IMPORT_INSPECTION_STATUS,
            lookup_types::IMPORT_TRANSIT_TIME_ZONE,
        )
    }

    /// 调拨收货字典（无血型）
    pub fn for_transfer_receipt(lookups: &[LookupOption]) -> Self {
        Self::split(
            lookups,
            lookup_types::TRANSFER_INSPECTION_STATUS,
            lookup_types::TRANSFER_TRANSIT_TIME_ZONE,
        )
    }

    fn split(lookups: &[LookupOption], inspection_type: &str, time_zone_type: &str) -> Self {
        let of_type = |t: &str| -> Vec<LookupOption> {
            lookups
                .iter()
                .filter(|l| l.active && l.lookup_type == t)
                .cloned()
                .collect()
        };

        let blood_types = if inspection_type == lookup_types::IMPORT_INSPECTION_STATUS {
            of_type(lookup_types::IMPORT_BLOOD_TYPES)
        } else {
            Vec::new()
        };

        Self {
            categories: of_type(lookup_types::PRODUCT_CATEGORY),
            inspections: of_type(inspection_type),
            blood_types,
            time_zones: of_type(time_zone_type),
        }
    }

    pub fn category(&self, option_value: &str) -> Option<&LookupOption> {
        self.categories.iter().find(|c| c.option_value == option_value)
    }

    pub fn inspection(&self, option_value: &str) -> Option<&LookupOption> {
        self.inspections.iter().find(|i| i.option_value == option_value)
    }

    /// 血型解析：按 optionValue 或 descriptionKey 匹配（忽略大小写）
    pub fn resolve_blood_type(&self, text: &str) -> Option<&LookupOption> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.blood_types.iter().find(|b| {
            b.option_value.eq_ignore_ascii_case(text) || b.description_key.eq_ignore_ascii_case(text)
        })
    }

    /// 运输时区：用设施 TZ 属性匹配时区字典的 optionValue
    pub fn time_zone(&self, facility_time_zone: Option<&str>) -> Option<&LookupOption> {
        let tz = facility_time_zone?;
        self.time_zones.iter().find(|z| z.option_value == tz)
    }
}
