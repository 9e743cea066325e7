// ==========================================
// 血液配送收货系统 - 引擎层
// ==========================================
// 职责: 收货向导状态机、产品批次、后果解析、完成轮询
// 红线: 引擎只经由 client 层 trait 访问外部服务
// ==========================================

pub mod batch_accumulator;
pub mod completion_poller;
pub mod consequence_resolver;
pub mod error;
pub mod events;
pub mod facility_resolver;
pub mod info_widget;
pub mod step_workflow;
pub mod transfer_receipt;

pub use batch_accumulator::{AddCandidateOutcome, BatchContext, ProductBatchAccumulator};
pub use completion_poller::{CompletionPoller, PollOutcome, PollerState};
pub use consequence_resolver::{ConsequenceResolver, InfoAssessment, QuarantineSummary};
pub use error::{WorkflowError, WorkflowResult};
pub use events::{
    messages, CollectingNotifier, CollectingProgressIndicator, NoOpNotifier,
    NoOpProgressIndicator, Notifier, ProgressEvent, ProgressIndicator, Toast, ToastLevel,
};
pub use facility_resolver::{FacilityResolution, FacilityResolver};
pub use info_widget::{labels, BadgeColor, InfoEntry, InfoValue, InfoWidget};
pub use step_workflow::{
    CompletionOutcome, CompletionPhase, ImportCollaborators, ImportWorkflow,
    InfoValidationOutcome, StepTransition,
};
pub use transfer_receipt::{
    CompletionCheck, OrderLookupOutcome, TransferAddOutcome, TransferCollaborators,
    TransferInfoOutcome, TransferReceiptWorkflow,
};
