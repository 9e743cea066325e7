// ==========================================
// 血液配送收货系统 - 领域模型层
// ==========================================
// 职责: 定义收货单草稿、批次行项目、后果、完成状态、调拨收货等实体
// 红线: 不含外部调用,不含工作流逻辑
// ==========================================

pub mod batch;
pub mod completion;
pub mod consequence;
pub mod lookup;
pub mod shipment;
pub mod transfer;
pub mod types;

// 重导出核心类型
pub use batch::{
    AttributeValue, BatchLineItem, FacilityIdentification, ItemAttribute, Patient,
    ProductEntryForm, ProductScan,
};
pub use completion::{
    CompletionFailure, CompletionState, CompletionStatus, CompletionTicket, ImportSubmission,
    ImportSubmissionItem, ProgressSnapshot,
};
pub use consequence::{Consequence, ConsequenceType, ItemConsequenceDto};
pub use lookup::{LookupCatalog, LookupOption};
pub use shipment::{
    ConditionalField, FacilityContext, ShipmentDraft, Temperature, TransitTime, TransitTimeRequest,
};
pub use transfer::{
    OriginFacility, SelectedTransferProduct, ShipmentRecord, TransferOrder,
    TransferProductCandidate, TransferReceipt, TransferReceiptItem, TransferReceiptSubmission,
};
pub use types::{
    LicenseStatus, NotificationType, RuleCode, TemperatureClass, TemperatureSign, WizardStep,
};
