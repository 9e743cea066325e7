// ==========================================
// 血液配送收货系统 - 领域类型定义
// ==========================================
// 职责: 规则码、通知类型、向导步骤、许可状态等枚举
// 序列化格式: 与规则引擎/后端接口保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 规则码 (Rule Code)
// ==========================================
// 规则引擎响应信封中的 ruleCode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCode {
    Ok,         // 规则执行成功
    BadRequest, // 规则拒绝请求
    #[serde(other)]
    Unknown,    // 未约定的规则码（按非拒绝处理）
}

impl RuleCode {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, RuleCode::BadRequest)
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCode::Ok => write!(f, "OK"),
            RuleCode::BadRequest => write!(f, "BAD_REQUEST"),
            RuleCode::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ==========================================
// 通知类型 (Notification Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Success,
    Info,
    Warning,
    Error,
    #[serde(other)]
    Other,
}

impl NotificationType {
    /// 提示框标题（首字母大写，如 "Warning"）
    pub fn title(&self) -> &'static str {
        match self {
            NotificationType::Success => "Success",
            NotificationType::Info => "Info",
            NotificationType::Warning => "Warning",
            NotificationType::Error => "Error",
            NotificationType::Other => "Info",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::Success => write!(f, "success"),
            NotificationType::Info => write!(f, "info"),
            NotificationType::Warning => write!(f, "warning"),
            NotificationType::Error => write!(f, "error"),
            NotificationType::Other => write!(f, "other"),
        }
    }
}

// ==========================================
// 向导步骤 (Wizard Step)
// ==========================================
// 顺序: Info(0) → ProductSelection(1) → Complete(2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardStep {
    Info,             // 填写收货信息
    ProductSelection, // 扫描/选择产品
    Complete,         // 完成提交
}

impl WizardStep {
    /// 由步进器索引转换
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(WizardStep::Info),
            1 => Some(WizardStep::ProductSelection),
            2 => Some(WizardStep::Complete),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            WizardStep::Info => 0,
            WizardStep::ProductSelection => 1,
            WizardStep::Complete => 2,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardStep::Info => write!(f, "INFO"),
            WizardStep::ProductSelection => write!(f, "PRODUCT_SELECTION"),
            WizardStep::Complete => write!(f, "COMPLETE"),
        }
    }
}

// ==========================================
// 许可状态 (License Status)
// ==========================================
// 序列化值为界面翻译键（后端按原值落库）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LicenseStatus {
    #[serde(rename = "licensed.label")]
    Licensed,
    #[default]
    #[serde(rename = "unlicensed.label")]
    Unlicensed,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Licensed => "licensed.label",
            LicenseStatus::Unlicensed => "unlicensed.label",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "licensed.label" => Some(LicenseStatus::Licensed),
            "unlicensed.label" => Some(LicenseStatus::Unlicensed),
            _ => None,
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 温度符号 (Temperature Sign)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureSign {
    #[default]
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl TemperatureSign {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureSign::Plus => "+",
            TemperatureSign::Minus => "-",
        }
    }
}

// ==========================================
// 产品类别温区 (Temperature Class)
// ==========================================
// 由产品类别 optionValue 派生，决定条件字段
pub mod category_values {
    pub const ROOM_TEMPERATURE: &str = "ORDER_PRODUCT_CATEGORY_ROOM_TEMPERATURE";
    pub const REFRIGERATED: &str = "ORDER_PRODUCT_CATEGORY_REFRIGERATED";
    pub const FROZEN: &str = "ORDER_PRODUCT_CATEGORY_FROZEN";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureClass {
    RoomTemperature, // 室温：需要温度 + 运输时长
    Refrigerated,    // 冷藏：需要温度
    Frozen,          // 冷冻及其他：无条件字段
}

impl TemperatureClass {
    pub fn from_option_value(option_value: &str) -> Self {
        match option_value {
            category_values::ROOM_TEMPERATURE => TemperatureClass::RoomTemperature,
            category_values::REFRIGERATED => TemperatureClass::Refrigerated,
            _ => TemperatureClass::Frozen,
        }
    }

    pub fn requires_temperature(&self) -> bool {
        matches!(
            self,
            TemperatureClass::RoomTemperature | TemperatureClass::Refrigerated
        )
    }

    pub fn requires_transit_time(&self) -> bool {
        matches!(self, TemperatureClass::RoomTemperature)
    }
}
