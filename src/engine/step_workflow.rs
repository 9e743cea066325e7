// ==========================================
// 血液配送收货系统 - 进口收货向导状态机
// ==========================================
// 步骤: Info → ProductSelection → Complete
// 规则:
// - 进入 ProductSelection 时执行表头校验；BAD_REQUEST 时停留在 Info
// - 退回 Info 时清空条件字段的值、注册号与产品录入表单
// - 类别变化时重算条件字段并清空批次
// - 完成前置条件: 表头有效 + 批次非空 + 患者/注册号无待补项
// 并发: 方法持有 &mut self，同一向导内调用天然串行；
//       完成流程进行中的重入由 phase 检查与界面禁用共同保证
//       complete 的 future 被中途丢弃时，下次调用前恢复到产品选择
// ==========================================

use crate::client::completion_client::ImportCompletionClient;
use crate::client::rule_client::{RuleRequest, RuleValidationClient};
use crate::client::rule_results::{RuleKind, RuleResults};
use crate::config::workflow_config_trait::{WorkflowConfigReader, WorkflowSettings};
use crate::domain::batch::{Patient, ProductScan};
use crate::domain::completion::{
    CompletionStatus, ImportSubmission, ImportSubmissionItem, PENDING_ITEM_STATUS,
};
use crate::domain::consequence::Consequence;
use crate::domain::lookup::{LookupCatalog, LookupOption};
use crate::domain::shipment::{FacilityContext, ShipmentDraft, Temperature, TransitTime};
use crate::domain::types::{LicenseStatus, WizardStep};
use crate::engine::batch_accumulator::{AddCandidateOutcome, BatchContext, ProductBatchAccumulator};
use crate::engine::completion_poller::{CompletionPoller, PollOutcome, PollerState};
use crate::engine::consequence_resolver::{ConsequenceResolver, QuarantineSummary};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{Notifier, ProgressIndicator, Toast};
use crate::engine::info_widget::InfoWidget;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 进口向导的外部协作者
#[derive(Clone)]
pub struct ImportCollaborators {
    pub rules: Arc<dyn RuleValidationClient>,
    pub completion: Arc<dyn ImportCompletionClient>,
    pub notifier: Arc<dyn Notifier>,
    pub progress: Arc<dyn ProgressIndicator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoValidationOutcome {
    Accepted {
        inspection_failed: bool,
        has_quarantine: bool,
    },
    /// 规则返回 BAD_REQUEST
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTransition {
    Unchanged,
    EnteredProductSelection {
        inspection_failed: bool,
        has_quarantine: bool,
    },
    InfoRejected,
    ReturnedToInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionPhase {
    Idle,
    InFlight,
    /// 终态已交付，等待进度框关闭
    AwaitingClose(CompletionStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(CompletionStatus),
    Cancelled,
}

pub struct ImportWorkflow {
    session_id: Uuid,
    settings: WorkflowSettings,
    catalog: LookupCatalog,
    facility: FacilityContext,
    rules: Arc<dyn RuleValidationClient>,
    notifier: Arc<dyn Notifier>,
    resolver: ConsequenceResolver,
    step: WizardStep,
    draft: ShipmentDraft,
    batch: ProductBatchAccumulator,
    shipment_consequences: Vec<Consequence>,
    info_widget: InfoWidget,
    poller: CompletionPoller,
    session_token: CancellationToken,
    active_attempt: Option<CancellationToken>,
    phase: CompletionPhase,
}

impl ImportWorkflow {
    /// 创建向导
    ///
    /// # 参数
    /// - session_token: 向导对话框持有的取消令牌，每次完成流程派生子令牌
    pub fn new(
        settings: WorkflowSettings,
        catalog: LookupCatalog,
        facility: FacilityContext,
        collaborators: ImportCollaborators,
        session_token: CancellationToken,
    ) -> Self {
        let batch = ProductBatchAccumulator::new(
            Arc::clone(&collaborators.rules),
            Arc::clone(&collaborators.notifier),
            &settings.import_add_product_rule,
        );
        let poller = CompletionPoller::new(
            collaborators.completion,
            Arc::clone(&collaborators.notifier),
            collaborators.progress,
            settings.status_poll_interval,
        );
        let session_id = Uuid::new_v4();
        info!(%session_id, facility_id = facility.facility_id, "进口收货向导启动");

        Self {
            session_id,
            resolver: ConsequenceResolver::new(&settings.inspection_result_property),
            draft: ShipmentDraft::new(facility.facility_id),
            settings,
            catalog,
            facility,
            rules: collaborators.rules,
            notifier: collaborators.notifier,
            step: WizardStep::Info,
            batch,
            shipment_consequences: Vec::new(),
            info_widget: InfoWidget::empty(),
            poller,
            session_token,
            active_attempt: None,
            phase: CompletionPhase::Idle,
        }
    }

    /// 从配置创建向导
    pub async fn from_config(
        reader: &dyn WorkflowConfigReader,
        catalog: LookupCatalog,
        facility: FacilityContext,
        collaborators: ImportCollaborators,
        session_token: CancellationToken,
    ) -> WorkflowResult<Self> {
        let settings = WorkflowSettings::load(reader).await?;
        Ok(Self::new(settings, catalog, facility, collaborators, session_token))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &ShipmentDraft {
        &self.draft
    }

    pub fn batch(&self) -> &ProductBatchAccumulator {
        &self.batch
    }

    /// 产品录入表单等界面状态
    pub fn batch_mut(&mut self) -> &mut ProductBatchAccumulator {
        &mut self.batch
    }

    pub fn shipment_consequences(&self) -> &[Consequence] {
        &self.shipment_consequences
    }

    pub fn info_widget(&self) -> &InfoWidget {
        &self.info_widget
    }

    pub fn completion_phase(&self) -> &CompletionPhase {
        &self.phase
    }

    pub fn poller_state(&self) -> &PollerState {
        self.poller.state()
    }

    pub fn has_quarantine(&self) -> bool {
        !self.shipment_consequences.is_empty()
    }

    pub fn quarantine_summary(&self) -> QuarantineSummary {
        ConsequenceResolver::summarize(&self.shipment_consequences, self.batch.items())
    }

    pub fn is_header_valid(&self) -> bool {
        self.draft.is_header_valid(self.settings.comments_max_length)
    }

    pub fn is_complete_disabled(&self) -> bool {
        !self.is_header_valid()
            || self.batch.is_empty()
            || self.batch.items().iter().any(|i| i.needs_patient())
            || self.batch.registration_number_needed()
            || self.completion_in_flight()
    }

    /// InFlight 且本次尝试令牌未被取消；被丢弃的尝试会取消其令牌
    fn completion_in_flight(&self) -> bool {
        self.phase == CompletionPhase::InFlight
            && self
                .active_attempt
                .as_ref()
                .is_some_and(|token| !token.is_cancelled())
    }

    // ==========================================
    // 表头输入
    // ==========================================

    /// 选择产品类别；类别变化时重算条件字段并清空批次
    pub fn select_category(&mut self, option_value: &str) -> WorkflowResult<()> {
        let option = self
            .catalog
            .category(option_value)
            .cloned()
            .ok_or_else(|| WorkflowError::InvalidInput(format!("未知产品类别: {}", option_value)))?;

        if self.draft.select_category(option) {
            self.batch.remove_all();
            debug!(
                session_id = %self.session_id,
                category = option_value,
                temperature = self.draft.temperature.is_required(),
                transit_time = self.draft.transit_time.is_required(),
                "产品类别变化，条件字段已重算"
            );
        }
        Ok(())
    }

    pub fn set_inspection(&mut self, option_value: &str) -> WorkflowResult<()> {
        if self.catalog.inspection(option_value).is_none() {
            return Err(WorkflowError::InvalidInput(format!(
                "未知目检结果: {}",
                option_value
            )));
        }
        self.draft.inspection = Some(option_value.to_string());
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: Temperature) -> WorkflowResult<()> {
        if !self.draft.temperature.fill(temperature) {
            return Err(WorkflowError::InvalidInput(
                "当前产品类别不需要温度".to_string(),
            ));
        }
        Ok(())
    }

    /// 运输时长计算器输出
    pub fn update_transit_time(&mut self, transit_time: TransitTime) -> WorkflowResult<()> {
        if !self.draft.transit_time.fill(transit_time) {
            return Err(WorkflowError::InvalidInput(
                "当前产品类别不需要运输时长".to_string(),
            ));
        }
        Ok(())
    }

    pub fn set_comments(&mut self, comments: Option<String>) {
        self.draft.comments = comments.filter(|c| !c.trim().is_empty());
    }

    // ==========================================
    // 步骤转换
    // ==========================================

    /// 步进器索引变化
    pub async fn on_step_changed(&mut self, index: usize) -> WorkflowResult<StepTransition> {
        let target = WizardStep::from_index(index)
            .ok_or_else(|| WorkflowError::InvalidInput(format!("无效的步骤索引: {}", index)))?;

        match (self.step, target) {
            (from, to) if from == to => Ok(StepTransition::Unchanged),
            (WizardStep::Info, WizardStep::ProductSelection) => {
                if !self.is_header_valid() {
                    warn!(
                        session_id = %self.session_id,
                        missing = ?self.draft.missing_fields(self.settings.comments_max_length),
                        "表头未完成，拒绝进入产品步骤"
                    );
                    return Err(self.invalid_transition(target));
                }
                match self.validate_info().await? {
                    InfoValidationOutcome::Accepted {
                        inspection_failed,
                        has_quarantine,
                    } => {
                        self.step = WizardStep::ProductSelection;
                        info!(session_id = %self.session_id, inspection_failed, has_quarantine, "进入产品步骤");
                        Ok(StepTransition::EnteredProductSelection {
                            inspection_failed,
                            has_quarantine,
                        })
                    }
                    InfoValidationOutcome::Rejected => Ok(StepTransition::InfoRejected),
                }
            }
            (WizardStep::ProductSelection, WizardStep::Info) => {
                self.return_to_info();
                Ok(StepTransition::ReturnedToInfo)
            }
            _ => Err(self.invalid_transition(target)),
        }
    }

    fn invalid_transition(&self, to: WizardStep) -> WorkflowError {
        WorkflowError::InvalidStepTransition {
            from: self.step.to_string(),
            to: to.to_string(),
        }
    }

    fn return_to_info(&mut self) {
        self.batch.clear_entry_state();
        self.draft.clear_conditional_values();
        self.shipment_consequences.clear();
        self.info_widget.clear();
        self.step = WizardStep::Info;
        info!(session_id = %self.session_id, "退回表头步骤");
    }

    /// 表头规则参数
    fn info_request(&self) -> RuleRequest {
        let temperature = match self.draft.temperature.value() {
            Some(t) => json!(t.signed_value()),
            None => json!(""),
        };
        let mut request = RuleRequest::new(&self.settings.import_info_rule)
            .with(
                "productCategory",
                json!(self.draft.category_description_key().unwrap_or_default()),
            )
            .with("temperature", temperature)
            .with(
                "visualInspectKey",
                self.draft.inspection.clone().map_or(Value::Null, Value::String),
            )
            .with("isImport", json!(true));
        if let Some(transit) = self.draft.transit_time.value() {
            request = request.merge(transit.request.to_parameters());
        }
        request
    }

    /// 表头校验
    ///
    /// 成功时一次性更新收货单后果与信息面板；失败时状态不变
    pub async fn validate_info(&mut self) -> WorkflowResult<InfoValidationOutcome> {
        let rule = self.settings.import_info_rule.clone();
        debug!(session_id = %self.session_id, rule = %rule, "表头校验");

        let response = match self.rules.validate(self.info_request()).await {
            Ok(r) => r,
            Err(e) => {
                error!(session_id = %self.session_id, rule = %rule, error = %e, "表头校验调用失败");
                self.notifier.notify(Toast::generic_failure());
                return Err(e.into());
            }
        };

        if response.is_bad_request() {
            warn!(session_id = %self.session_id, rule = %rule, "表头校验被拒绝");
            self.notifier.notify(Toast::generic_failure());
            return Ok(InfoValidationOutcome::Rejected);
        }

        let results = match RuleKind::ImportInformation
            .decode(&response)
            .and_then(RuleResults::into_consequences)
        {
            Ok(r) => r,
            Err(e) => {
                error!(session_id = %self.session_id, rule = %rule, error = %e, "表头校验结果解析失败");
                self.notifier.notify(Toast::generic_failure());
                return Err(e.into());
            }
        };

        for notification in &response.notifications {
            self.notifier.notify(Toast::from_notification(notification));
        }

        let assessment = self.resolver.assess(&results.consequences);
        self.info_widget =
            InfoWidget::for_import(&self.draft, &self.catalog, assessment.inspection_failed);
        self.shipment_consequences = assessment.quarantine;

        Ok(InfoValidationOutcome::Accepted {
            inspection_failed: assessment.inspection_failed,
            has_quarantine: self.has_quarantine(),
        })
    }

    // ==========================================
    // 产品批次
    // ==========================================

    fn batch_context(&self) -> BatchContext {
        BatchContext {
            facility_id: self.facility.facility_id,
            family_category: self.draft.category_option_value().map(str::to_string),
        }
    }

    fn ensure_product_step(&self) -> WorkflowResult<()> {
        if self.step != WizardStep::ProductSelection {
            return Err(WorkflowError::PreconditionFailed(format!(
                "当前步骤不允许录入产品: {}",
                self.step
            )));
        }
        Ok(())
    }

    pub async fn add_product(&mut self, scan: ProductScan) -> WorkflowResult<AddCandidateOutcome> {
        self.ensure_product_step()?;
        let ctx = self.batch_context();
        self.batch.add_candidate(scan, &ctx).await
    }

    /// 用当前录入表单添加产品（补注册号后的重试）
    pub async fn add_product_from_entry_form(&mut self) -> WorkflowResult<AddCandidateOutcome> {
        self.ensure_product_step()?;
        let ctx = self.batch_context();
        self.batch.add_from_entry_form(&ctx).await
    }

    /// 血型文本解析（按 optionValue 或 descriptionKey）
    pub fn resolve_blood_type(&self, text: &str) -> WorkflowResult<LookupOption> {
        self.catalog
            .resolve_blood_type(text)
            .cloned()
            .ok_or_else(|| WorkflowError::InvalidInput(format!("未知血型: {}", text)))
    }

    pub fn remove_product(&mut self, index: usize) -> WorkflowResult<()> {
        self.batch
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| WorkflowError::InvalidInput(format!("产品序号不存在: {}", index)))
    }

    pub fn remove_all_products(&mut self) {
        self.batch.remove_all();
    }

    pub fn associate_patient(&mut self, index: usize, patient: Patient) -> WorkflowResult<bool> {
        self.batch.associate_patient(index, patient)
    }

    // ==========================================
    // 完成
    // ==========================================

    /// 组装提交载荷
    pub fn build_submission(&self) -> ImportSubmission {
        let shipment_quarantined = self.has_quarantine();
        let transit = self.draft.transit_time.value();

        let import_items = self
            .batch
            .items()
            .iter()
            .map(|item| {
                let license_status = item.license_status();
                ImportSubmissionItem {
                    unit_number: item.unit_number.clone(),
                    product_code: item.isbt_product_code.clone(),
                    blood_type: item.blood_type.clone(),
                    product_consequence_key: ConsequenceResolver::item_consequence_type(
                        item,
                        shipment_quarantined,
                    ),
                    license_status: license_status.map(|s| s.as_str().to_string()),
                    expiration_date: item.expiration_date,
                    license_number: match license_status {
                        Some(LicenseStatus::Licensed) => item
                            .facility_identification
                            .as_ref()
                            .and_then(|f| f.license_number.clone()),
                        _ => None,
                    },
                    registration_number: item
                        .facility_identification
                        .as_ref()
                        .and_then(|f| f.registration_number.clone()),
                    status: PENDING_ITEM_STATUS.to_string(),
                    patient_id: item.patient.as_ref().map(|p| p.id),
                    import_item_attributes: item.item_attributes.clone(),
                    import_item_consequences: ConsequenceResolver::item_consequences(
                        &self.shipment_consequences,
                        item,
                    ),
                }
            })
            .collect();

        ImportSubmission {
            location_id: self.facility.facility_id,
            temperature: self.draft.temperature.value().map(Temperature::signed_text),
            comments: self.draft.comments.clone(),
            product_category: self.draft.category_description_key().map(str::to_string),
            shipment_inspect_key: self.draft.inspection.clone(),
            total_transit_time: transit.map(|t| t.total_transit_time.clone()),
            transit_start_date_time: transit.map(|t| t.request.start_date_time()),
            transit_end_date_time: transit.map(|t| t.request.end_date_time()),
            transit_timezone: self
                .catalog
                .time_zone(self.facility.time_zone.as_deref())
                .map(|z| z.option_value.clone()),
            transit_time_result_key: transit.and_then(|t| t.result_key.clone()),
            import_items,
        }
    }

    fn check_completion_preconditions(&self) -> WorkflowResult<()> {
        if self.completion_in_flight() {
            return Err(WorkflowError::PreconditionFailed("完成流程进行中".to_string()));
        }
        if !self.is_header_valid() {
            return Err(WorkflowError::PreconditionFailed("表头未完成".to_string()));
        }
        if self.batch.is_empty() {
            return Err(WorkflowError::PreconditionFailed("批次为空".to_string()));
        }
        if self.batch.registration_number_needed() {
            return Err(WorkflowError::PreconditionFailed("注册号待补".to_string()));
        }
        if self.batch.items().iter().any(|i| i.needs_patient()) {
            return Err(WorkflowError::PreconditionFailed("存在未关联患者的产品".to_string()));
        }
        Ok(())
    }

    /// 提交完成并轮询至终态
    ///
    /// 取消: 会话令牌被取消时停止轮询，返回 Cancelled
    pub async fn complete(&mut self) -> WorkflowResult<CompletionOutcome> {
        self.recover_interrupted_completion();
        self.check_completion_preconditions()?;

        self.batch.reset_entry_form();
        let submission = self.build_submission();
        self.step = WizardStep::Complete;
        self.phase = CompletionPhase::InFlight;

        let attempt = self.session_token.child_token();
        self.active_attempt = Some(attempt.clone());
        info!(session_id = %self.session_id, items = submission.import_items.len(), "开始完成流程");

        let abandon_guard = attempt.clone().drop_guard();
        let result = self.poller.run(&submission, &attempt).await;
        let _ = abandon_guard.disarm();
        self.active_attempt = None;

        match result {
            Ok(PollOutcome::Completed(status)) => {
                self.phase = CompletionPhase::AwaitingClose(status.clone());
                Ok(CompletionOutcome::Completed(status))
            }
            Ok(PollOutcome::Cancelled) => {
                self.phase = CompletionPhase::Idle;
                self.step = WizardStep::ProductSelection;
                Ok(CompletionOutcome::Cancelled)
            }
            Err(e) => {
                self.phase = CompletionPhase::Idle;
                self.step = WizardStep::ProductSelection;
                Err(e)
            }
        }
    }

    /// 上次 complete 的 future 未运行到结束即被丢弃时，回到产品选择
    ///
    /// complete 开始前自动调用；宿主也可在超时/中止后立即调用以刷新界面状态
    ///
    /// # 返回
    /// - 是否发生了恢复
    pub fn recover_interrupted_completion(&mut self) -> bool {
        if self.phase != CompletionPhase::InFlight || self.completion_in_flight() {
            return false;
        }
        warn!(session_id = %self.session_id, "上次完成流程被中断，恢复到产品选择");
        self.active_attempt = None;
        self.poller.reset();
        self.phase = CompletionPhase::Idle;
        self.step = WizardStep::ProductSelection;
        true
    }

    /// 取消进行中的完成流程
    pub fn cancel_completion(&self) {
        if let Some(token) = &self.active_attempt {
            token.cancel();
        }
    }

    /// 进度框关闭：按隔离情况提示后重置向导
    ///
    /// # 返回
    /// - 已提示的文案键；未处于终态时为空
    pub fn on_progress_closed(&mut self) -> Vec<&'static str> {
        if !matches!(self.phase, CompletionPhase::AwaitingClose(_)) {
            debug!(session_id = %self.session_id, "进度框关闭时未处于终态，忽略");
            return Vec::new();
        }

        let messages = self.quarantine_summary().completion_messages();
        for message in &messages {
            self.notifier.notify(Toast::success(message));
        }
        self.reset();
        messages
    }

    /// 重置为初始空状态
    pub fn reset(&mut self) {
        if let Some(token) = self.active_attempt.take() {
            token.cancel();
        }
        self.draft = ShipmentDraft::new(self.facility.facility_id);
        self.batch.reset();
        self.shipment_consequences.clear();
        self.info_widget.clear();
        self.poller.reset();
        self.phase = CompletionPhase::Idle;
        self.step = WizardStep::Info;
        info!(session_id = %self.session_id, "向导已重置");
    }
}

impl Drop for ImportWorkflow {
    fn drop(&mut self) {
        if let Some(token) = self.active_attempt.take() {
            token.cancel();
        }
    }
}
