// ==========================================
// 血液配送收货系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: 内存 key-value，可由 JSON 文件/快照/环境变量填充
// 覆写顺序: 默认值 < 配置文件 < 环境变量 < 运行时设置
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::workflow_config_trait::WorkflowConfigReader;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// 环境变量前缀: RECEIVING_WORKFLOW_<KEY>
pub const ENV_PREFIX: &str = "RECEIVING_WORKFLOW_";

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // ===== 规则名称 =====
    pub const IMPORT_INFO_RULE: &str = "rule.import_information";
    pub const IMPORT_ADD_PRODUCT_RULE: &str = "rule.import_add_product";
    pub const TRANSFER_INFO_RULE: &str = "rule.transfer_information";
    pub const TRANSFER_ELIGIBILITY_RULE: &str = "rule.transfer_eligibility";
    pub const TRANSFER_PRODUCT_RULE: &str = "rule.transfer_product_selected";
    /// 标记目检字段的 resultProperty
    pub const INSPECTION_RESULT_PROPERTY: &str = "rule.inspection_result_property";

    // ===== 完成轮询 =====
    pub const STATUS_POLL_INTERVAL_MS: &str = "completion.status_poll_interval_ms";

    // ===== 表单限制 =====
    pub const COMMENTS_MAX_LENGTH: &str = "import.comments_max_length";
    pub const TRANSFER_COMMENTS_MAX_LENGTH: &str = "transfer.comments_max_length";
    pub const ORDER_NUMBER_MAX_LENGTH: &str = "transfer.order_number_max_length";
}

/// 默认值
pub mod defaults {
    pub const IMPORT_INFO_RULE: &str = "imports-information-validation";
    pub const IMPORT_ADD_PRODUCT_RULE: &str = "imports-add-product-to-batch-validation";
    pub const TRANSFER_INFO_RULE: &str = "transfer-receipt-information-validation";
    pub const TRANSFER_ELIGIBILITY_RULE: &str = "rul-0116-transfer-receipt-eligibility-rules";
    pub const TRANSFER_PRODUCT_RULE: &str = "rul-0117-transfer-receipt-product-selected-validation";
    pub const INSPECTION_RESULT_PROPERTY: &str = "visualInspectKey";
    pub const STATUS_POLL_INTERVAL_MS: u64 = 3000;
    pub const COMMENTS_MAX_LENGTH: usize = 1000;
    pub const TRANSFER_COMMENTS_MAX_LENGTH: usize = 500;
    pub const ORDER_NUMBER_MAX_LENGTH: usize = 50;
}

/// 默认配置文件路径
///
/// 优先级: 环境变量 RECEIVING_WORKFLOW_CONFIG > 系统配置目录 > 当前目录
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("RECEIVING_WORKFLOW_CONFIG") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("receiving-workflow").join("config.json"),
        None => PathBuf::from("receiving-workflow.json"),
    }
}

/// 配置键 → 环境变量名，如 rule.import_information → RECEIVING_WORKFLOW_RULE_IMPORT_INFORMATION
pub fn env_var_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.replace('.', "_").to_uppercase())
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl ConfigManager {
    /// 创建空配置（全部使用默认值）
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文件加载
    ///
    /// 文件内容为扁平对象 {"key": "value"}；数字/布尔值按文本保存
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let manager = Self::new();
        let count = manager.restore_config_from_snapshot(&raw)?;
        info!(path = %path.display(), count, "配置文件加载完成");
        Ok(manager)
    }

    /// 加载默认路径的配置文件；文件不存在时使用默认值
    pub fn load_default() -> ConfigResult<Self> {
        let path = default_config_path();
        let manager = if path.exists() {
            Self::from_file(&path)?
        } else {
            debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            Self::new()
        };
        manager.apply_env_overrides()?;
        Ok(manager)
    }

    /// 读取配置值
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    /// 读取配置值，带默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// 读取数值配置，缺省时用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + Copy,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// 用环境变量覆写已知配置键
    ///
    /// # 返回
    /// - 覆写的配置项数量
    pub fn apply_env_overrides(&self) -> ConfigResult<usize> {
        let mut count = 0;
        for key in Self::known_keys() {
            if let Ok(value) = std::env::var(env_var_name(key)) {
                debug!(key, "环境变量覆写配置");
                self.set_config_value(key, &value)?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn known_keys() -> [&'static str; 10] {
        [
            config_keys::IMPORT_INFO_RULE,
            config_keys::IMPORT_ADD_PRODUCT_RULE,
            config_keys::TRANSFER_INFO_RULE,
            config_keys::TRANSFER_ELIGIBILITY_RULE,
            config_keys::TRANSFER_PRODUCT_RULE,
            config_keys::INSPECTION_RESULT_PROPERTY,
            config_keys::STATUS_POLL_INTERVAL_MS,
            config_keys::COMMENTS_MAX_LENGTH,
            config_keys::TRANSFER_COMMENTS_MAX_LENGTH,
            config_keys::ORDER_NUMBER_MAX_LENGTH,
        ]
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let values = self
            .values
            .read()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;
        let ordered: std::collections::BTreeMap<_, _> = values.iter().collect();
        Ok(serde_json::to_string(&json!(ordered))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 以 "__meta_" 开头的键为元信息，不回写
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let parsed: HashMap<String, serde_json::Value> = serde_json::from_str(snapshot_json)?;

        let mut values = self
            .values
            .write()
            .map_err(|e| ConfigError::Lock(e.to_string()))?;

        let mut count = 0;
        for (key, value) in parsed {
            if key.starts_with("__meta_") {
                continue;
            }
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            values.insert(key, text);
            count += 1;
        }
        Ok(count)
    }
}

// ==========================================
// WorkflowConfigReader 实现
// ==========================================
#[async_trait]
impl WorkflowConfigReader for ConfigManager {
    async fn get_import_info_rule(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::IMPORT_INFO_RULE, defaults::IMPORT_INFO_RULE)
    }

    async fn get_import_add_product_rule(&self) -> ConfigResult<String> {
        self.get_config_or_default(
            config_keys::IMPORT_ADD_PRODUCT_RULE,
            defaults::IMPORT_ADD_PRODUCT_RULE,
        )
    }

    async fn get_transfer_info_rule(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::TRANSFER_INFO_RULE, defaults::TRANSFER_INFO_RULE)
    }

    async fn get_transfer_eligibility_rule(&self) -> ConfigResult<String> {
        self.get_config_or_default(
            config_keys::TRANSFER_ELIGIBILITY_RULE,
            defaults::TRANSFER_ELIGIBILITY_RULE,
        )
    }

    async fn get_transfer_product_rule(&self) -> ConfigResult<String> {
        self.get_config_or_default(
            config_keys::TRANSFER_PRODUCT_RULE,
            defaults::TRANSFER_PRODUCT_RULE,
        )
    }

    async fn get_inspection_result_property(&self) -> ConfigResult<String> {
        self.get_config_or_default(
            config_keys::INSPECTION_RESULT_PROPERTY,
            defaults::INSPECTION_RESULT_PROPERTY,
        )
    }

    async fn get_status_poll_interval(&self) -> ConfigResult<Duration> {
        let ms = self.get_parsed_or_default(
            config_keys::STATUS_POLL_INTERVAL_MS,
            defaults::STATUS_POLL_INTERVAL_MS,
        )?;
        if ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: config_keys::STATUS_POLL_INTERVAL_MS.to_string(),
                value: "0".to_string(),
                message: "轮询间隔必须大于 0".to_string(),
            });
        }
        Ok(Duration::from_millis(ms))
    }

    async fn get_comments_max_length(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(
            config_keys::COMMENTS_MAX_LENGTH,
            defaults::COMMENTS_MAX_LENGTH,
        )
    }

    async fn get_transfer_comments_max_length(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(
            config_keys::TRANSFER_COMMENTS_MAX_LENGTH,
            defaults::TRANSFER_COMMENTS_MAX_LENGTH,
        )
    }

    async fn get_order_number_max_length(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(
            config_keys::ORDER_NUMBER_MAX_LENGTH,
            defaults::ORDER_NUMBER_MAX_LENGTH,
        )
    }
}
