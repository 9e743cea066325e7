// ==========================================
// 血液配送收货系统 - 调拨收货向导
// ==========================================
// 流程: 单号资格评估 → 调拨单查询 → 表头校验(与来源设施并发)
//       → 产品选择校验 → 完整性检查 → 创建收货单
// 说明: 无轮询，创建接口一次返回
// ==========================================

use crate::client::error::ClientError;
use crate::client::rule_client::{RuleEvaluationRequest, RuleRequest, RuleValidationClient};
use crate::client::rule_results::{RuleKind, RuleResults};
use crate::client::transfer_client::TransferReceiptClient;
use crate::config::workflow_config_trait::WorkflowSettings;
use crate::domain::consequence::{Consequence, ItemConsequenceDto};
use crate::domain::lookup::{lookup_types, LookupCatalog, LookupOption};
use crate::domain::shipment::{FacilityContext, ShipmentDraft, Temperature, TransitTime};
use crate::domain::transfer::{
    SelectedTransferProduct, TransferOrder, TransferProductCandidate, TransferReceipt,
    TransferReceiptItem, TransferReceiptSubmission,
};
use crate::domain::types::{category_values, NotificationType, WizardStep};
use crate::engine::consequence_resolver::ConsequenceResolver;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{messages, Notifier, Toast};
use crate::engine::info_widget::InfoWidget;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct TransferCollaborators {
    pub rules: Arc<dyn RuleValidationClient>,
    pub transfers: Arc<dyn TransferReceiptClient>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderLookupOutcome {
    Found,
    /// 资格评估返回 400 错误通知
    Ineligible,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferInfoOutcome {
    Accepted { inspection_failed: bool },
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAddOutcome {
    Added { index: usize, quarantine: bool },
    /// 库存 ID 已选，静默忽略
    Duplicate,
    /// 响应未携带 200 通知
    NotAdded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCheck {
    Ready,
    /// 已选 + 已收 < 已发，需要确认
    NeedsConfirmation { shipped: usize, entered: usize },
}

pub struct TransferReceiptWorkflow {
    session_id: Uuid,
    settings: WorkflowSettings,
    catalog: LookupCatalog,
    facility: FacilityContext,
    rules: Arc<dyn RuleValidationClient>,
    transfers: Arc<dyn TransferReceiptClient>,
    notifier: Arc<dyn Notifier>,
    resolver: ConsequenceResolver,
    step: WizardStep,
    order_number: Option<String>,
    order: Option<TransferOrder>,
    draft: ShipmentDraft,
    consequences: Vec<Consequence>,
    info_widget: InfoWidget,
    products: Vec<SelectedTransferProduct>,
    mark_for_quarantine: bool,
}

impl TransferReceiptWorkflow {
    pub fn new(
        settings: WorkflowSettings,
        catalog: LookupCatalog,
        facility: FacilityContext,
        collaborators: TransferCollaborators,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(%session_id, facility_id = facility.facility_id, "调拨收货向导启动");
        Self {
            session_id,
            resolver: ConsequenceResolver::new(&settings.inspection_result_property),
            draft: ShipmentDraft::new(facility.facility_id),
            settings,
            catalog,
            facility,
            rules: collaborators.rules,
            transfers: collaborators.transfers,
            notifier: collaborators.notifier,
            step: WizardStep::Info,
            order_number: None,
            order: None,
            consequences: Vec::new(),
            info_widget: InfoWidget::empty(),
            products: Vec::new(),
            mark_for_quarantine: false,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn order(&self) -> Option<&TransferOrder> {
        self.order.as_ref()
    }

    pub fn order_number(&self) -> Option<&str> {
        self.order_number.as_deref()
    }

    pub fn draft(&self) -> &ShipmentDraft {
        &self.draft
    }

    pub fn consequences(&self) -> &[Consequence] {
        &self.consequences
    }

    pub fn info_widget(&self) -> &InfoWidget {
        &self.info_widget
    }

    pub fn products(&self) -> &[SelectedTransferProduct] {
        &self.products
    }

    pub fn mark_for_quarantine(&self) -> bool {
        self.mark_for_quarantine
    }

    pub fn is_header_valid(&self) -> bool {
        self.order.is_some()
            && self.order_number.is_some()
            && self
                .draft
                .is_header_valid(self.settings.transfer_comments_max_length)
    }

    pub fn is_complete_enabled(&self) -> bool {
        self.step == WizardStep::ProductSelection && self.is_header_valid() && !self.products.is_empty()
    }

    // ==========================================
    // 表头
    // ==========================================

    /// 输入调拨单号
    pub async fn enter_order_number(&mut self, order_number: &str) -> WorkflowResult<OrderLookupOutcome> {
        let order_number = order_number.trim();
        if order_number.is_empty() {
            return Err(WorkflowError::InvalidInput("调拨单号为空".to_string()));
        }
        if order_number.chars().count() > self.settings.order_number_max_length {
            return Err(WorkflowError::InvalidInput(format!(
                "调拨单号超过 {} 个字符",
                self.settings.order_number_max_length
            )));
        }

        let request = RuleEvaluationRequest::new(&self.settings.transfer_eligibility_rule)
            .with_input("orderNumber", json!(order_number))
            .with_input("currentLocationId", json!(self.facility.facility_id));
        debug!(session_id = %self.session_id, order_number, "调拨单资格评估");

        let evaluation = self.rules.evaluate(request).await.map_err(|e| {
            error!(session_id = %self.session_id, error = %e, "调拨单资格评估失败");
            self.notifier.notify(Toast::generic_failure());
            WorkflowError::from(e)
        })?;

        let ineligible = evaluation
            .notifications
            .iter()
            .find(|n| n.has_status(400) && n.notification_type == NotificationType::Error);
        if let Some(notification) = ineligible {
            warn!(session_id = %self.session_id, order_number, "调拨单不满足收货条件");
            self.notifier.notify(Toast::error(&notification.message));
            self.clear_order();
            return Ok(OrderLookupOutcome::Ineligible);
        }

        let found = self
            .transfers
            .find_order_by_number(order_number)
            .await
            .map_err(|e| {
                error!(session_id = %self.session_id, error = %e, "调拨单查询失败");
                self.notifier.notify(Toast::generic_failure());
                WorkflowError::from(e)
            })?;

        let Some(order) = found else {
            self.notifier.notify(Toast::error(messages::ORDER_NOT_FOUND));
            self.clear_order();
            return Ok(OrderLookupOutcome::NotFound);
        };

        let category_key = order
            .product_category_key
            .clone()
            .unwrap_or_else(|| category_values::FROZEN.to_string());
        let category = self.catalog.category(&category_key).cloned().unwrap_or_else(|| {
            LookupOption::new(0, lookup_types::PRODUCT_CATEGORY, &category_key, &category_key)
        });
        self.draft.select_category(category);

        info!(session_id = %self.session_id, order_id = order.id, category = %category_key, "调拨单已确认");
        self.order_number = Some(order_number.to_string());
        self.order = Some(order);
        Ok(OrderLookupOutcome::Found)
    }

    fn clear_order(&mut self) {
        self.order_number = None;
        self.order = None;
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

    fn info_request(&self, order: &TransferOrder) -> RuleRequest {
        let temperature = match self.draft.temperature.value() {
            Some(t) => json!(t.signed_value()),
            None => json!(""),
        };
        let mut request = RuleRequest::new(&self.settings.transfer_info_rule)
            .with("orderNumber", json!(order.order_number))
            .with(
                "productCategory",
                json!(self.draft.category_option_value().unwrap_or_default()),
            )
            .with("temperature", temperature)
            .with(
                "inspectionKey",
                self.draft.inspection.clone().map_or(Value::Null, Value::String),
            );
        if let Some(transit) = self.draft.transit_time.value() {
            request = request.merge(transit.request.to_parameters());
        }
        request
    }

    /// 提交表头：规则校验与来源设施查询并发执行
    pub async fn submit_info(&mut self) -> WorkflowResult<TransferInfoOutcome> {
        if !self.is_header_valid() {
            return Err(WorkflowError::PreconditionFailed("表头未完成".to_string()));
        }
        let order = match &self.order {
            Some(o) => o.clone(),
            None => return Err(WorkflowError::PreconditionFailed("未确认调拨单".to_string())),
        };

        let request = self.info_request(&order);
        let rules = Arc::clone(&self.rules);
        let transfers = Arc::clone(&self.transfers);
        let joined = futures::try_join!(
            rules.validate(request),
            transfers.get_facility(order.location_id)
        );

        let (response, origin) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "调拨表头校验失败");
                self.notifier.notify(Toast::generic_failure());
                return Err(e.into());
            }
        };

        if response.is_bad_request() {
            warn!(session_id = %self.session_id, rule = %self.settings.transfer_info_rule, "调拨表头校验被拒绝");
            self.notifier.notify(Toast::generic_failure());
            return Ok(TransferInfoOutcome::Rejected);
        }

        let results = match RuleKind::TransferInformation
            .decode(&response)
            .and_then(RuleResults::into_consequences)
        {
            Ok(r) => r,
            Err(e) => {
                self.notifier.notify(Toast::generic_failure());
                return Err(e.into());
            }
        };

        let assessment = self.resolver.assess(&results.consequences);
        self.info_widget = InfoWidget::for_transfer(
            &self.draft,
            &self.catalog,
            &order,
            &origin,
            assessment.inspection_failed,
        );
        self.consequences = assessment.quarantine;
        self.step = WizardStep::ProductSelection;

        if let Some(warning) = response.first_of_type(NotificationType::Warning) {
            self.notifier.notify(Toast::error(&warning.message));
        }

        info!(
            session_id = %self.session_id,
            inspection_failed = assessment.inspection_failed,
            quarantine = self.consequences.len(),
            "进入调拨产品步骤"
        );
        Ok(TransferInfoOutcome::Accepted {
            inspection_failed: assessment.inspection_failed,
        })
    }

    /// 退回表头：清空表头、备注、运输时长、后果与类别
    pub fn step_back(&mut self) {
        self.draft = ShipmentDraft::new(self.facility.facility_id);
        self.clear_order();
        self.consequences.clear();
        self.info_widget.clear();
        self.products.clear();
        self.mark_for_quarantine = false;
        self.step = WizardStep::Info;
        info!(session_id = %self.session_id, "调拨向导退回表头步骤");
    }

    // ==========================================
    // 产品选择
    // ==========================================

    pub async fn add_product(
        &mut self,
        candidate: TransferProductCandidate,
    ) -> WorkflowResult<TransferAddOutcome> {
        if self.step != WizardStep::ProductSelection {
            return Err(WorkflowError::PreconditionFailed(
                "当前步骤不允许选择产品".to_string(),
            ));
        }
        let order = self
            .order
            .as_ref()
            .ok_or_else(|| WorkflowError::PreconditionFailed("未确认调拨单".to_string()))?;

        if self
            .products
            .iter()
            .any(|p| p.product.inventory_id == candidate.inventory_id)
        {
            debug!(inventory_id = candidate.inventory_id, "产品已选，忽略");
            return Ok(TransferAddOutcome::Duplicate);
        }

        let rule = self.settings.transfer_product_rule.clone();
        let request = RuleRequest::new(&rule)
            .with("unitNumber", json!(candidate.unit_number))
            .with("productCode", json!(candidate.product_code))
            .with(
                "isbtProductCode",
                json!(candidate.isbt_product_code.clone().unwrap_or_default()),
            )
            .with("orderId", json!(order.id))
            .with(
                "labelStatus",
                order.label_status.clone().map_or(Value::Null, Value::String),
            );

        let response = self.rules.validate(request).await.map_err(|e| {
            error!(session_id = %self.session_id, rule = %rule, error = %e, "产品选择校验失败");
            self.notifier.notify(Toast::generic_failure());
            WorkflowError::from(e)
        })?;

        if response.is_bad_request() {
            warn!(session_id = %self.session_id, rule = %rule, "产品选择校验被拒绝");
            self.notifier.notify(Toast::generic_failure());
            return Err(WorkflowError::ValidationRejected { rule });
        }

        if let Some(rejection) = response.notification_with_status(400) {
            self.notifier.notify(Toast::error(&rejection.message));
        } else if let Some(warning) = response.first_of_type(NotificationType::Warning) {
            self.notifier.notify(Toast::warning(&warning.message));
        }

        if response.notification_with_status(200).is_none() {
            return Ok(TransferAddOutcome::NotAdded);
        }

        let results = RuleKind::TransferProductSelected
            .decode(&response)
            .and_then(RuleResults::into_product_selected)
            .map_err(|e| {
                self.notifier.notify(Toast::generic_failure());
                WorkflowError::from(e)
            })?;

        let quarantine = results.quarantine();
        let index = self.products.len();
        self.products.push(SelectedTransferProduct {
            product: candidate,
            quarantine,
        });
        self.recompute_quarantine();
        info!(session_id = %self.session_id, index, quarantine, "调拨产品已选");
        Ok(TransferAddOutcome::Added { index, quarantine })
    }

    pub fn remove_product(&mut self, index: usize) -> WorkflowResult<()> {
        if index >= self.products.len() {
            return Err(WorkflowError::InvalidInput(format!(
                "产品序号不存在: {}",
                index
            )));
        }
        self.products.remove(index);
        self.recompute_quarantine();
        Ok(())
    }

    pub fn remove_all_products(&mut self) {
        self.products.clear();
        self.recompute_quarantine();
    }

    fn recompute_quarantine(&mut self) {
        self.mark_for_quarantine = self.products.iter().any(|p| p.quarantine);
    }

    // ==========================================
    // 完成
    // ==========================================

    /// 完整性检查：已发数量 vs 已选 + 已收
    pub async fn prepare_completion(&self) -> WorkflowResult<CompletionCheck> {
        if !self.is_complete_enabled() {
            return Err(WorkflowError::PreconditionFailed(
                "调拨收货尚不能完成".to_string(),
            ));
        }
        let order_id = match &self.order {
            Some(o) => o.id,
            None => return Err(WorkflowError::PreconditionFailed("未确认调拨单".to_string())),
        };

        let joined = futures::try_join!(
            self.transfers.list_shipments(order_id),
            self.transfers.list_transfer_receipts(order_id)
        );
        let (shipments, receipts) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                error!(session_id = %self.session_id, order_id, error = %e, "发货/收货记录查询失败");
                self.notifier.notify(Toast::generic_failure());
                return Err(e.into());
            }
        };

        let shipped: usize = shipments.iter().map(|s| s.items.len()).sum();
        let received: usize = receipts.iter().map(|r| r.transfer_receipt_items.len()).sum();
        let entered = self.products.len() + received;
        debug!(order_id, shipped, received, selected = self.products.len(), "调拨完整性检查");

        if entered >= shipped {
            Ok(CompletionCheck::Ready)
        } else {
            Ok(CompletionCheck::NeedsConfirmation { shipped, entered })
        }
    }

    pub fn build_submission(&self, comments: Option<String>) -> WorkflowResult<TransferReceiptSubmission> {
        let order = self
            .order
            .as_ref()
            .ok_or_else(|| WorkflowError::PreconditionFailed("未确认调拨单".to_string()))?;
        let transit = self.draft.transit_time.value();
        let consequences: Vec<ItemConsequenceDto> =
            self.consequences.iter().map(ItemConsequenceDto::from).collect();

        Ok(TransferReceiptSubmission {
            order_id: order.id,
            order_number: order.order_number.clone(),
            location_id: self.facility.facility_id,
            temperature: self.draft.temperature.value().map(Temperature::signed_text),
            total_transit_time: transit.map(|t| t.total_transit_time.clone()),
            transit_start_date_time: transit.map(|t| t.request.start_date_time()),
            transit_end_date_time: transit.map(|t| t.request.end_date_time()),
            transit_timezone: self
                .catalog
                .time_zone(self.facility.time_zone.as_deref())
                .map(|z| z.option_value.clone()),
            transit_time_result_key: transit.and_then(|t| t.result_key.clone()),
            inspection_key: self.draft.inspection.clone(),
            comments: comments
                .filter(|c| !c.trim().is_empty())
                .or_else(|| self.draft.comments.clone()),
            transfer_receipt_items: self
                .products
                .iter()
                .map(|p| TransferReceiptItem {
                    inventory_id: p.product.inventory_id,
                    unit_number: p.product.unit_number.clone(),
                    product_code: p.product.product_code.clone(),
                    transfer_receipt_item_consequences: consequences.clone(),
                })
                .collect(),
        })
    }

    /// 创建调拨收货单
    ///
    /// # 参数
    /// - comments: 确认框中填写的备注，覆盖表头备注
    pub async fn complete(&mut self, comments: Option<String>) -> WorkflowResult<TransferReceipt> {
        if !self.is_complete_enabled() {
            return Err(WorkflowError::PreconditionFailed(
                "调拨收货尚不能完成".to_string(),
            ));
        }
        if let Some(c) = &comments {
            if c.chars().count() > self.settings.transfer_comments_max_length {
                return Err(WorkflowError::InvalidInput("备注超过最大长度".to_string()));
            }
        }
        let submission = self.build_submission(comments)?;

        match self.transfers.create_transfer_receipt(&submission).await {
            Ok(receipt) => {
                if receipt.has_quarantine() || self.mark_for_quarantine {
                    self.notifier.notify(Toast::warning(messages::TRANSFER_QUARANTINED));
                }
                self.notifier.notify(Toast::success(messages::TRANSFER_COMPLETE));
                info!(
                    session_id = %self.session_id,
                    receipt_id = ?receipt.id,
                    items = receipt.transfer_receipt_items.len(),
                    "调拨收货完成"
                );
                self.reset();
                Ok(receipt)
            }
            Err(e) => {
                match &e {
                    ClientError::UnexpectedStatus(code) => {
                        warn!(session_id = %self.session_id, status = code, "调拨收货单未创建")
                    }
                    other => error!(session_id = %self.session_id, error = %other, "调拨收货单创建失败"),
                }
                self.notifier.notify(Toast::generic_failure());
                Err(e.into())
            }
        }
    }

    pub fn reset(&mut self) {
        self.step_back();
        info!(session_id = %self.session_id, "调拨向导已重置");
    }
}
