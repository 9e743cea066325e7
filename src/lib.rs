// ==========================================
// 血液配送收货系统 - 核心库
// ==========================================
// 职责: 进口收货向导与调拨收货向导的工作流引擎
// 技术栈: Rust + tokio + serde
// 系统定位: 界面无关的状态机 (外部服务经 trait 注入)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 外部服务接口层 - 规则校验/完成/调拨
pub mod client;

// 引擎层 - 向导状态机
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    LicenseStatus, NotificationType, RuleCode, TemperatureSign, WizardStep,
};

// 领域实体
pub use domain::{
    BatchLineItem, CompletionStatus, Consequence, ImportSubmission, LookupCatalog, LookupOption,
    ProductScan, ShipmentDraft, TransferOrder, TransferReceipt,
};

// 外部服务
pub use client::{
    ClientError, ImportCompletionClient, RuleValidationClient, TransferReceiptClient,
};

// 引擎
pub use engine::{
    ImportCollaborators, ImportWorkflow, Notifier, ProgressIndicator, TransferCollaborators,
    TransferReceiptWorkflow, WorkflowError, WorkflowResult,
};

// 配置
pub use config::{ConfigManager, WorkflowSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "血液配送收货系统";
