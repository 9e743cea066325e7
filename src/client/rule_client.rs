// ==========================================
// 血液配送收货系统 - 规则引擎客户端 Trait
// ==========================================
// 职责: 定义规则校验/规则评估接口与响应信封（不包含实现）
// 请求: { ruleName, ...扁平参数 }
// 响应: { ruleCode, notifications[], results? }
// ==========================================

use crate::client::error::{ClientError, ClientResult};
use crate::domain::types::{NotificationType, RuleCode};
use async_trait::async_trait;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==========================================
// RuleRequest - 规则校验请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRequest {
    #[serde(rename = "ruleName")]
    pub rule_name: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl RuleRequest {
    pub fn new(rule_name: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            parameters: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// 合并一组扁平参数（同名覆盖）
    pub fn merge(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

// ==========================================
// RuleEvaluationRequest - 规则评估请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluationRequest {
    pub rule_name: String,
    pub rule_inputs: Map<String, Value>,
}

impl RuleEvaluationRequest {
    pub fn new(rule_name: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            rule_inputs: Map::new(),
        }
    }

    pub fn with_input(mut self, key: &str, value: Value) -> Self {
        self.rule_inputs.insert(key.to_string(), value);
        self
    }
}

// ==========================================
// Notification - 业务通知
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub notification_type: NotificationType,
    /// 服务端可能以数字或字符串返回
    #[serde(default, deserialize_with = "status_code_text")]
    pub status_code: Option<String>,
}

fn status_code_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl Notification {
    pub fn new(notification_type: NotificationType, message: &str) -> Self {
        Self {
            message: message.to_string(),
            notification_type,
            status_code: None,
        }
    }

    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code.to_string());
        self
    }

    pub fn has_status(&self, code: u16) -> bool {
        self.status_code.as_deref() == Some(code.to_string().as_str())
    }
}

// ==========================================
// RuleResponse - 规则响应信封
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub rule_code: RuleCode,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub results: Option<Value>,
}

impl RuleResponse {
    pub fn is_bad_request(&self) -> bool {
        self.rule_code.is_bad_request()
    }

    /// 按结果形状解码；results 缺失时返回默认值
    pub fn decode_results<T>(&self) -> ClientResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match &self.results {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(ClientError::from),
        }
    }

    pub fn notification_with_status(&self, code: u16) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.has_status(code))
    }

    pub fn first_of_type(&self, notification_type: NotificationType) -> Option<&Notification> {
        self.notifications
            .iter()
            .find(|n| n.notification_type == notification_type)
    }
}

// ==========================================
// RuleValidationClient Trait
// ==========================================
// 实现者: 宿主应用的 HTTP/GraphQL 适配器；测试中为脚本化 mock
#[async_trait]
pub trait RuleValidationClient: Send + Sync {
    /// 执行指定规则的校验
    async fn validate(&self, request: RuleRequest) -> ClientResult<RuleResponse>;

    /// 执行指定规则的评估（仅关心 notifications）
    async fn evaluate(&self, request: RuleEvaluationRequest) -> ClientResult<RuleResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_flattens_parameters() {
        let mut transit = Map::new();
        transit.insert("transitStartDate".to_string(), json!("2024-03-01"));

        let request = RuleRequest::new("imports-information-validation")
            .with("productCategory", json!("frozen.label"))
            .with("isImport", json!(true))
            .merge(transit);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["ruleName"], "imports-information-validation");
        assert_eq!(value["isImport"], true);
        assert_eq!(value["transitStartDate"], "2024-03-01");
    }

    #[test]
    fn test_response_envelope() {
        let response: RuleResponse = serde_json::from_value(json!({
            "ruleCode": "OK",
            "notifications": [
                {"message": "a", "notificationType": "warning", "statusCode": 200},
                {"message": "b", "notificationType": "error", "statusCode": "400"}
            ]
        }))
        .unwrap();

        assert!(!response.is_bad_request());
        assert_eq!(response.notification_with_status(200).unwrap().message, "a");
        assert_eq!(response.notification_with_status(400).unwrap().message, "b");
        assert_eq!(
            response.first_of_type(NotificationType::Error).unwrap().message,
            "b"
        );
    }

    #[test]
    fn test_decode_missing_results_as_default() {
        let response = RuleResponse {
            rule_code: RuleCode::Ok,
            notifications: vec![],
            results: None,
        };
        let decoded: Vec<String> = response.decode_results().unwrap();
        assert!(decoded.is_empty());
    }
}
