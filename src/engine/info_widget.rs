// ==========================================
// 血液配送收货系统 - 收货信息面板
// ==========================================
// 职责: 表头校验通过后生成只读摘要
// 目检徽标: 不合格为红色，否则为绿色
// ==========================================

use crate::domain::lookup::LookupCatalog;
use crate::domain::shipment::ShipmentDraft;
use crate::domain::transfer::{OriginFacility, TransferOrder};

/// 面板标签键
pub mod labels {
    pub const CATEGORY: &str = "labeling-product-category.label";
    pub const INSPECTION: &str = "inspection.label";
    pub const TRANSIT_TIME: &str = "transit-time.label";
    pub const TRANSIT_TIME_RESULT: &str = "transit-time-result.label";
    pub const TEMPERATURE: &str = "temperature.label";
    pub const CELSIUS: &str = "celsius.label";
    pub const TRANSFER_NUMBER: &str = "transfer-number.label";
    pub const DATE_TRANSFERRED: &str = "date-transferred.label";
    pub const LABEL_STATUS: &str = "label-status.label";
    pub const ORIGINATING_FACILITY: &str = "originating-facility.label";
    pub const ACCEPTABLE: &str = "acceptable.label";
    pub const UNACCEPTABLE: &str = "unacceptable.label";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Red,
}

impl BadgeColor {
    pub fn hex(&self) -> &'static str {
        match self {
            BadgeColor::Green => "#4caf50",
            BadgeColor::Red => "#f65151",
        }
    }

    pub fn for_failure(failed: bool) -> Self {
        if failed {
            BadgeColor::Red
        } else {
            BadgeColor::Green
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Text(String),
    Badge { keys: Vec<String>, color: BadgeColor },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoEntry {
    pub label: &'static str,
    pub value: InfoValue,
    /// 数值后缀键，如摄氏度
    pub suffix_key: Option<&'static str>,
}

impl InfoEntry {
    pub fn text(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: InfoValue::Text(value.to_string()),
            suffix_key: None,
        }
    }

    pub fn badge(label: &'static str, key: &str, color: BadgeColor) -> Self {
        Self {
            label,
            value: InfoValue::Badge {
                keys: vec![key.to_string()],
                color,
            },
            suffix_key: None,
        }
    }

    pub fn with_suffix(mut self, suffix_key: &'static str) -> Self {
        self.suffix_key = Some(suffix_key);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfoWidget {
    entries: Vec<InfoEntry>,
}

impl InfoWidget {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 进口收货面板：类别、目检徽标、运输时长、温度
    pub fn for_import(draft: &ShipmentDraft, catalog: &LookupCatalog, inspection_failed: bool) -> Self {
        let mut widget = Self::empty();
        widget.push(InfoEntry::text(
            labels::CATEGORY,
            draft.category_description_key().unwrap_or_default(),
        ));
        widget.push(inspection_entry(draft, catalog, inspection_failed));
        if let Some(transit) = draft.transit_time.value() {
            widget.push(InfoEntry::text(labels::TRANSIT_TIME, &transit.display_text()));
        }
        if let Some(temperature) = draft.temperature.value() {
            widget.push(
                InfoEntry::text(labels::TEMPERATURE, &temperature.signed_text())
                    .with_suffix(labels::CELSIUS),
            );
        }
        widget
    }

    /// 调拨收货面板
    pub fn for_transfer(
        draft: &ShipmentDraft,
        catalog: &LookupCatalog,
        order: &TransferOrder,
        facility: &OriginFacility,
        inspection_failed: bool,
    ) -> Self {
        let mut widget = Self::empty();
        widget.push(InfoEntry::text(labels::TRANSFER_NUMBER, &order.order_number));
        widget.push(InfoEntry::text(
            labels::DATE_TRANSFERRED,
            &order
                .transferred_on()
                .map(|d| d.format("%m/%d/%Y").to_string())
                .unwrap_or_default(),
        ));
        widget.push(InfoEntry::text(
            labels::CATEGORY,
            draft.category_description_key().unwrap_or_default(),
        ));
        widget.push(inspection_entry(draft, catalog, inspection_failed));

        if let Some(transit) = draft.transit_time.value() {
            // 运输时长排在目检徽标之前
            let at = widget.entries.len() - 1;
            let result_key = if transit.is_unacceptable() {
                labels::UNACCEPTABLE
            } else {
                labels::ACCEPTABLE
            };
            widget.entries.insert(
                at,
                InfoEntry::badge(
                    labels::TRANSIT_TIME_RESULT,
                    result_key,
                    BadgeColor::for_failure(transit.is_unacceptable()),
                ),
            );
            widget.entries.insert(
                at,
                InfoEntry::text(labels::TRANSIT_TIME, &transit.display_text()),
            );
        }
        if let Some(temperature) = draft.temperature.value() {
            widget.push(
                InfoEntry::text(labels::TEMPERATURE, &temperature.signed_text())
                    .with_suffix(labels::CELSIUS),
            );
        }
        widget.push(InfoEntry::text(
            labels::LABEL_STATUS,
            order.label_status.as_deref().unwrap_or_default(),
        ));
        widget.push(InfoEntry::text(labels::ORIGINATING_FACILITY, &facility.name));
        widget
    }

    pub fn push(&mut self, entry: InfoEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[InfoEntry] {
        &self.entries
    }

    pub fn entry(&self, label: &str) -> Option<&InfoEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 目检徽标
    pub fn inspection_badge(&self) -> Option<(&[String], BadgeColor)> {
        match self.entry(labels::INSPECTION).map(|e| &e.value) {
            Some(InfoValue::Badge { keys, color }) => Some((keys.as_slice(), *color)),
            _ => None,
        }
    }
}

fn inspection_entry(draft: &ShipmentDraft, catalog: &LookupCatalog, failed: bool) -> InfoEntry {
    let inspection = draft.inspection.as_deref().unwrap_or_default();
    let key = catalog
        .inspection(inspection)
        .map(|i| i.description_key.as_str())
        .unwrap_or(inspection);
    InfoEntry::badge(labels::INSPECTION, key, BadgeColor::for_failure(failed))
}
