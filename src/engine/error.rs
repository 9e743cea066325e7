// ==========================================
// 血液配送收货系统 - 工作流错误类型
// ==========================================
// 说明: 重复扫描、规则拒绝、待补注册号等业务结果以结果枚举返回，
//       不进入错误类型
// ==========================================

use crate::client::error::ClientError;
use crate::config::error::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    // ===== 外部调用 =====
    #[error("外部服务调用失败: {0}")]
    Client(#[from] ClientError),

    // ===== 输入与状态 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效的步骤转换: {from} → {to}")]
    InvalidStepTransition { from: String, to: String },

    #[error("前置条件不满足: {0}")]
    PreconditionFailed(String),

    #[error("规则拒绝请求 (rule: {rule})")]
    ValidationRejected { rule: String },

    #[error("操作已取消")]
    Cancelled,

    // ===== 配置 =====
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type WorkflowResult<T> = Result<T, WorkflowError>;
