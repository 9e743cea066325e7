// ==========================================
// 血液配送收货系统 - 收货单草稿 (Shipment Draft)
// ==========================================
// 职责: 表头字段、条件字段（温度/运输时长）、表头有效性
// 规则: 条件字段的存在性由产品类别的纯函数推导
//       室温 → 温度 + 运输时长；冷藏 → 温度；其他 → 无
// ==========================================

use crate::domain::lookup::LookupOption;
use crate::domain::types::{TemperatureClass, TemperatureSign};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==========================================
// ConditionalField - 条件字段
// ==========================================
// Absent: 当前不需要
// Pending: 需要但未填写
// Filled: 需要且已填写
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConditionalField<T> {
    #[default]
    Absent,
    Pending,
    Filled(T),
}

impl<T> ConditionalField<T> {
    pub fn is_required(&self) -> bool {
        !matches!(self, ConditionalField::Absent)
    }

    /// 不需要或已填写
    pub fn is_satisfied(&self) -> bool {
        !matches!(self, ConditionalField::Pending)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ConditionalField::Filled(v) => Some(v),
            _ => None,
        }
    }

    /// 填写值；字段不存在时拒绝并返回 false
    pub fn fill(&mut self, value: T) -> bool {
        if !self.is_required() {
            return false;
        }
        *self = ConditionalField::Filled(value);
        true
    }

    /// 清空已填写的值，保留"需要"状态
    pub fn clear(&mut self) {
        if self.is_required() {
            *self = ConditionalField::Pending;
        }
    }

    /// 标记为需要（已填写的值保留）
    pub fn require(&mut self) {
        if !self.is_required() {
            *self = ConditionalField::Pending;
        }
    }

    pub fn remove(&mut self) {
        *self = ConditionalField::Absent;
    }
}

// ==========================================
// Temperature - 温度（符号 + 数值）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub sign: TemperatureSign,
    pub magnitude: f64,
}

impl Temperature {
    pub fn new(sign: TemperatureSign, magnitude: f64) -> Self {
        Self {
            sign,
            magnitude: magnitude.abs(),
        }
    }

    /// 规则参数使用的带符号数值
    pub fn signed_value(&self) -> f64 {
        match self.sign {
            TemperatureSign::Plus => self.magnitude,
            TemperatureSign::Minus => -self.magnitude,
        }
    }

    /// 提交载荷使用的带符号文本，如 "+4"、"-18"
    pub fn signed_text(&self) -> String {
        format!("{}{}", self.sign.symbol(), self.magnitude)
    }
}

// ==========================================
// TransitTime - 运输时长描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitTimeRequest {
    pub transit_start_date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub transit_start_time: NaiveTime,
    pub transit_start_time_zone: String,
    pub transit_end_date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub transit_end_time: NaiveTime,
    pub transit_end_time_zone: String,
}

impl TransitTimeRequest {
    pub fn start_date_time(&self) -> NaiveDateTime {
        self.transit_start_date.and_time(self.transit_start_time)
    }

    pub fn end_date_time(&self) -> NaiveDateTime {
        self.transit_end_date.and_time(self.transit_end_time)
    }

    /// 展开为扁平的规则参数
    pub fn to_parameters(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// 运输时刻以 `HH:mm` 传输；读取时兼容带秒的格式
mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&text, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

/// 运输时长计算器输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitTime {
    pub request: TransitTimeRequest,
    /// 总时长文本，如 "02 hours and 30 minutes"
    pub total_transit_time: String,
    pub result_key: Option<String>,
    pub color: Option<String>,
}

impl TransitTime {
    pub fn is_unacceptable(&self) -> bool {
        self.color.as_deref() == Some("red")
    }

    /// 信息面板显示的简写
    pub fn display_text(&self) -> String {
        self.total_transit_time
            .replacen(" and ", " ", 1)
            .trim_start_matches('0')
            .replacen("minutes", "mins", 1)
    }
}

// ==========================================
// 条件字段推导
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldRequirements {
    pub temperature: bool,
    pub transit_time: bool,
}

/// 由类别 optionValue 推导条件字段（纯函数）
pub fn conditional_requirements(category_option_value: Option<&str>) -> FieldRequirements {
    match category_option_value.map(TemperatureClass::from_option_value) {
        Some(class) => FieldRequirements {
            temperature: class.requires_temperature(),
            transit_time: class.requires_transit_time(),
        },
        None => FieldRequirements::default(),
    }
}

// ==========================================
// FacilityContext - 当前收货设施
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityContext {
    pub facility_id: i64,
    /// 设施 TZ 属性
    pub time_zone: Option<String>,
}

impl FacilityContext {
    pub fn new(facility_id: i64) -> Self {
        Self {
            facility_id,
            time_zone: None,
        }
    }

    pub fn with_time_zone(mut self, tz: &str) -> Self {
        self.time_zone = Some(tz.to_string());
        self
    }
}

// ==========================================
// ShipmentDraft - 收货单表头草稿
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentDraft {
    pub facility_id: i64,
    pub category: Option<LookupOption>,
    pub inspection: Option<String>,
    pub temperature: ConditionalField<Temperature>,
    pub transit_time: ConditionalField<TransitTime>,
    pub comments: Option<String>,
}

impl ShipmentDraft {
    pub fn new(facility_id: i64) -> Self {
        Self {
            facility_id,
            category: None,
            inspection: None,
            temperature: ConditionalField::Absent,
            transit_time: ConditionalField::Absent,
            comments: None,
        }
    }

    pub fn category_option_value(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.option_value.as_str())
    }

    pub fn category_description_key(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.description_key.as_str())
    }

    /// 选择类别并重算条件字段
    ///
    /// 返回类别是否发生变化；变化时温度与运输时长的旧值一并丢弃
    pub fn select_category(&mut self, option: LookupOption) -> bool {
        let changed = self.category_option_value() != Some(option.option_value.as_str());
        self.category = Some(option);
        if changed {
            self.temperature.remove();
            self.transit_time.remove();
        }
        self.apply_requirements(conditional_requirements(self.category_option_value()));
        changed
    }

    pub fn apply_requirements(&mut self, requirements: FieldRequirements) {
        if requirements.temperature {
            self.temperature.require();
        } else {
            self.temperature.remove();
        }
        if requirements.transit_time {
            self.transit_time.require();
        } else {
            self.transit_time.remove();
        }
    }

    /// 清空条件字段的值，字段本身仍按类别保留
    pub fn clear_conditional_values(&mut self) {
        self.temperature.clear();
        self.transit_time.clear();
    }

    /// 未满足的表头字段名
    pub fn missing_fields(&self, comments_max_length: usize) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.category.is_none() {
            missing.push("productCategory");
        }
        if self.inspection.as_deref().map_or(true, str::is_empty) {
            missing.push("inspection");
        }
        if !self.temperature.is_satisfied() {
            missing.push("temperature");
        }
        if !self.transit_time.is_satisfied() {
            missing.push("transitTime");
        }
        if self
            .comments
            .as_ref()
            .map_or(false, |c| c.chars().count() > comments_max_length)
        {
            missing.push("comments");
        }
        missing
    }

    pub fn is_header_valid(&self, comments_max_length: usize) -> bool {
        self.missing_fields(comments_max_length).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lookup::lookup_types;
    use crate::domain::types::category_values;

    fn category(value: &str) -> LookupOption {
        LookupOption::new(1, lookup_types::PRODUCT_CATEGORY, value, &format!("{}.label", value))
    }

    fn transit() -> TransitTime {
        TransitTime {
            request: TransitTimeRequest {
                transit_start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                transit_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                transit_start_time_zone: "America/Chicago".to_string(),
                transit_end_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                transit_end_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
                transit_end_time_zone: "America/Chicago".to_string(),
            },
            total_transit_time: "02 hours and 30 minutes".to_string(),
            result_key: Some("acceptable.label".to_string()),
            color: Some("green".to_string()),
        }
    }

    #[test]
    fn test_conditional_requirements() {
        let room = conditional_requirements(Some(category_values::ROOM_TEMPERATURE));
        assert!(room.temperature && room.transit_time);

        let fridge = conditional_requirements(Some(category_values::REFRIGERATED));
        assert!(fridge.temperature && !fridge.transit_time);

        let frozen = conditional_requirements(Some(category_values::FROZEN));
        assert_eq!(frozen, FieldRequirements::default());
        assert_eq!(conditional_requirements(None), FieldRequirements::default());
    }

    #[test]
    fn test_category_change_away_removes_fields_regardless_of_state() {
        // 每个起始类别 × 是否已填写 → 切换到冷冻后两个字段都不存在
        for start in [category_values::ROOM_TEMPERATURE, category_values::REFRIGERATED] {
            for filled in [false, true] {
                let mut draft = ShipmentDraft::new(1);
                draft.select_category(category(start));
                if filled {
                    draft.temperature.fill(Temperature::new(TemperatureSign::Plus, 4.0));
                    draft.transit_time.fill(transit());
                }

                draft.select_category(category(category_values::FROZEN));

                assert_eq!(draft.temperature, ConditionalField::Absent);
                assert_eq!(draft.transit_time, ConditionalField::Absent);
            }
        }
    }

    #[test]
    fn test_category_change_resets_values() {
        let mut draft = ShipmentDraft::new(1);
        draft.select_category(category(category_values::ROOM_TEMPERATURE));
        assert!(draft.temperature.fill(Temperature::new(TemperatureSign::Plus, 20.0)));

        // 切换到冷藏：温度仍需要但旧值丢弃
        assert!(draft.select_category(category(category_values::REFRIGERATED)));
        assert_eq!(draft.temperature, ConditionalField::Pending);
        assert_eq!(draft.transit_time, ConditionalField::Absent);

        // 重复选择同一类别不丢值
        draft.temperature.fill(Temperature::new(TemperatureSign::Plus, 4.0));
        assert!(!draft.select_category(category(category_values::REFRIGERATED)));
        assert!(draft.temperature.value().is_some());
    }

    #[test]
    fn test_fill_rejected_when_absent() {
        let mut field: ConditionalField<Temperature> = ConditionalField::Absent;
        assert!(!field.fill(Temperature::new(TemperatureSign::Minus, 18.0)));
        assert_eq!(field, ConditionalField::Absent);
    }

    #[test]
    fn test_header_validity() {
        let mut draft = ShipmentDraft::new(1);
        assert!(!draft.is_header_valid(1000));

        draft.select_category(category(category_values::REFRIGERATED));
        draft.inspection = Some("ACCEPTABLE".to_string());
        assert_eq!(draft.missing_fields(1000), vec!["temperature"]);

        draft.temperature.fill(Temperature::new(TemperatureSign::Plus, 4.0));
        assert!(draft.is_header_valid(1000));

        draft.comments = Some("x".repeat(11));
        assert!(!draft.is_header_valid(10));
        assert!(draft.is_header_valid(11));
    }

    #[test]
    fn test_temperature_text() {
        let t = Temperature::new(TemperatureSign::Minus, 18.0);
        assert_eq!(t.signed_text(), "-18");
        assert_eq!(t.signed_value(), -18.0);
        assert_eq!(Temperature::new(TemperatureSign::Plus, 4.5).signed_text(), "+4.5");
    }

    #[test]
    fn test_transit_parameters_and_display() {
        let t = transit();
        let params = t.request.to_parameters();
        assert_eq!(params["transitStartDate"], "2024-03-01");
        assert_eq!(params["transitStartTime"], "08:00");
        assert_eq!(params["transitEndTime"], "08:30");
        assert_eq!(params["transitStartTimeZone"], "America/Chicago");
        assert_eq!(t.display_text(), "2 hours 30 mins");
        assert!(!t.is_unacceptable());
    }

    #[test]
    fn test_transit_time_accepts_seconds_on_read() {
        let json = r#"{"transitStartDate":"2024-03-01","transitStartTime":"08:00:00",
            "transitStartTimeZone":"UTC","transitEndDate":"2024-03-01",
            "transitEndTime":"09:15","transitEndTimeZone":"UTC"}"#;
        let request: TransitTimeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.transit_start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(request.transit_end_time, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert!(serde_json::from_str::<TransitTimeRequest>(&json.replace("09:15", "9h15")).is_err());
    }
}
