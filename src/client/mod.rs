// ==========================================
// 血液配送收货系统 - 外部服务接口层
// ==========================================
// 职责: 定义工作流依赖的外部协作者 trait 与请求/响应 DTO
// 红线: 不含传输实现,由宿主应用注入
// ==========================================

pub mod completion_client;
pub mod error;
pub mod rule_client;
pub mod rule_results;
pub mod transfer_client;

pub use completion_client::ImportCompletionClient;
pub use error::{ClientError, ClientResult};
pub use rule_client::{
    Notification, RuleEvaluationRequest, RuleRequest, RuleResponse, RuleValidationClient,
};
pub use rule_results::{
    AddProductResults, ConsequenceResults, ProductDescription, ProductSelectedResults, RuleKind,
    RuleResults,
};
pub use transfer_client::TransferReceiptClient;
