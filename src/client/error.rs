// ==========================================
// 血液配送收货系统 - 外部服务错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 外部服务（规则引擎/完成服务/调拨服务）错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    // ===== 传输错误 =====
    #[error("传输失败: {0}")]
    Transport(String),

    // ===== 响应错误 =====
    #[error("响应格式错误: {0}")]
    MalformedResponse(String),

    #[error("非预期的响应状态码: {0}")]
    UnexpectedStatus(u16),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse(err.to_string())
    }
}

/// Result 类型别名
pub type ClientResult<T> = Result<T, ClientError>;
