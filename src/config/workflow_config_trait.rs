// ==========================================
// 血液配送收货系统 - 工作流配置读取 Trait
// ==========================================
// 职责: 定义工作流所需的配置读取接口
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::defaults;
use crate::config::error::ConfigResult;
use async_trait::async_trait;
use std::time::Duration;

// ==========================================
// WorkflowConfigReader Trait
// ==========================================
// 实现者: ConfigManager
#[async_trait]
pub trait WorkflowConfigReader: Send + Sync {
    // ===== 规则名称 =====

    async fn get_import_info_rule(&self) -> ConfigResult<String>;

    async fn get_import_add_product_rule(&self) -> ConfigResult<String>;

    async fn get_transfer_info_rule(&self) -> ConfigResult<String>;

    async fn get_transfer_eligibility_rule(&self) -> ConfigResult<String>;

    async fn get_transfer_product_rule(&self) -> ConfigResult<String>;

    /// 后果中标记"目检字段"的 resultProperty
    ///
    /// # 默认值
    /// - visualInspectKey
    async fn get_inspection_result_property(&self) -> ConfigResult<String>;

    // ===== 完成轮询 =====

    /// 完成状态轮询间隔
    ///
    /// # 默认值
    /// - 3000 ms
    async fn get_status_poll_interval(&self) -> ConfigResult<Duration>;

    // ===== 表单限制 =====

    /// 进口备注最大长度（默认 1000）
    async fn get_comments_max_length(&self) -> ConfigResult<usize>;

    /// 调拨备注最大长度（默认 500）
    async fn get_transfer_comments_max_length(&self) -> ConfigResult<usize>;

    /// 调拨单号最大长度（默认 50）
    async fn get_order_number_max_length(&self) -> ConfigResult<usize>;
}

// ==========================================
// WorkflowSettings - 向导启动时解析的配置
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub import_info_rule: String,
    pub import_add_product_rule: String,
    pub transfer_info_rule: String,
    pub transfer_eligibility_rule: String,
    pub transfer_product_rule: String,
    pub inspection_result_property: String,
    pub status_poll_interval: Duration,
    pub comments_max_length: usize,
    pub transfer_comments_max_length: usize,
    pub order_number_max_length: usize,
}

impl WorkflowSettings {
    pub async fn load(reader: &dyn WorkflowConfigReader) -> ConfigResult<Self> {
        Ok(Self {
            import_info_rule: reader.get_import_info_rule().await?,
            import_add_product_rule: reader.get_import_add_product_rule().await?,
            transfer_info_rule: reader.get_transfer_info_rule().await?,
            transfer_eligibility_rule: reader.get_transfer_eligibility_rule().await?,
            transfer_product_rule: reader.get_transfer_product_rule().await?,
            inspection_result_property: reader.get_inspection_result_property().await?,
            status_poll_interval: reader.get_status_poll_interval().await?,
            comments_max_length: reader.get_comments_max_length().await?,
            transfer_comments_max_length: reader.get_transfer_comments_max_length().await?,
            order_number_max_length: reader.get_order_number_max_length().await?,
        })
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            import_info_rule: defaults::IMPORT_INFO_RULE.to_string(),
            import_add_product_rule: defaults::IMPORT_ADD_PRODUCT_RULE.to_string(),
            transfer_info_rule: defaults::TRANSFER_INFO_RULE.to_string(),
            transfer_eligibility_rule: defaults::TRANSFER_ELIGIBILITY_RULE.to_string(),
            transfer_product_rule: defaults::TRANSFER_PRODUCT_RULE.to_string(),
            inspection_result_property: defaults::INSPECTION_RESULT_PROPERTY.to_string(),
            status_poll_interval: Duration::from_millis(defaults::STATUS_POLL_INTERVAL_MS),
            comments_max_length: defaults::COMMENTS_MAX_LENGTH,
            transfer_comments_max_length: defaults::TRANSFER_COMMENTS_MAX_LENGTH,
            order_number_max_length: defaults::ORDER_NUMBER_MAX_LENGTH,
        }
    }
}
