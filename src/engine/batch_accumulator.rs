// ==========================================
// 血液配送收货系统 - 产品批次累加器
// ==========================================
// 职责: 维护当前收货单的产品列表与录入表单
// 红线: (unitNumber, productCode) 在批次内唯一
//       规则拒绝或调用失败时批次不变
// ==========================================

use crate::client::rule_client::{RuleRequest, RuleValidationClient};
use crate::client::rule_results::{RuleKind, RuleResults};
use crate::domain::batch::{
    BatchLineItem, FacilityIdentification, Patient, ProductEntryForm, ProductScan,
};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{messages, Notifier, Toast};
use crate::engine::facility_resolver::{FacilityResolution, FacilityResolver};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 产品校验所需的收货单上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub facility_id: i64,
    /// 产品类别 optionValue
    pub family_category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddCandidateOutcome {
    Added { index: usize },
    /// 已在批次中，静默忽略
    Duplicate,
    /// 规则返回 BAD_REQUEST
    Rejected,
    /// 候选设施不唯一，表单保留待补注册号
    RegistrationNumberRequired { candidates: usize },
    /// 规则未返回产品
    NoItemReturned,
}

pub struct ProductBatchAccumulator {
    rules: Arc<dyn RuleValidationClient>,
    notifier: Arc<dyn Notifier>,
    rule_name: String,
    items: Vec<BatchLineItem>,
    entry_form: ProductEntryForm,
    patient_record_needed: bool,
    facility_candidates: Vec<FacilityIdentification>,
}

impl ProductBatchAccumulator {
    pub fn new(
        rules: Arc<dyn RuleValidationClient>,
        notifier: Arc<dyn Notifier>,
        rule_name: &str,
    ) -> Self {
        Self {
            rules,
            notifier,
            rule_name: rule_name.to_string(),
            items: Vec::new(),
            entry_form: ProductEntryForm::default(),
            patient_record_needed: false,
            facility_candidates: Vec::new(),
        }
    }

    // ===== 查询 =====

    pub fn items(&self) -> &[BatchLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn entry_form(&self) -> &ProductEntryForm {
        &self.entry_form
    }

    pub fn entry_form_mut(&mut self) -> &mut ProductEntryForm {
        &mut self.entry_form
    }

    pub fn patient_record_needed(&self) -> bool {
        self.patient_record_needed
    }

    pub fn registration_number_needed(&self) -> bool {
        self.entry_form.registration_number.is_required()
    }

    /// 最近一次校验返回的候选设施（供界面展示）
    pub fn facility_candidates(&self) -> &[FacilityIdentification] {
        &self.facility_candidates
    }

    pub fn contains(&self, unit_number: &str, product_code: &str) -> bool {
        self.items
            .iter()
            .any(|i| i.identity_key() == (unit_number, product_code))
    }

    // ===== 添加 =====

    /// 用当前录入表单添加产品
    pub async fn add_from_entry_form(
        &mut self,
        ctx: &BatchContext,
    ) -> WorkflowResult<AddCandidateOutcome> {
        let scan = self.entry_form.to_scan().ok_or_else(|| {
            WorkflowError::InvalidInput("产品录入表单不完整".to_string())
        })?;
        self.add_candidate(scan, ctx).await
    }

    /// 校验并加入一个产品
    pub async fn add_candidate(
        &mut self,
        scan: ProductScan,
        ctx: &BatchContext,
    ) -> WorkflowResult<AddCandidateOutcome> {
        self.entry_form.load(&scan);

        if self.contains(&scan.unit_number, &scan.product_code) {
            debug!(unit_number = %scan.unit_number, product_code = %scan.product_code, "重复扫描，忽略");
            self.reset_entry_form();
            return Ok(AddCandidateOutcome::Duplicate);
        }

        let request = self.build_request(&scan, ctx);
        debug!(rule = %self.rule_name, unit_number = %scan.unit_number, "产品校验");

        let response = match self.rules.validate(request).await {
            Ok(r) => r,
            Err(e) => {
                error!(rule = %self.rule_name, error = %e, "产品校验调用失败");
                self.notifier.notify(Toast::generic_failure());
                self.reset_entry_form();
                return Err(e.into());
            }
        };

        if response.is_bad_request() {
            warn!(rule = %self.rule_name, unit_number = %scan.unit_number, "产品校验被拒绝");
            self.notifier.notify(Toast::generic_failure());
            self.reset_entry_form();
            return Ok(AddCandidateOutcome::Rejected);
        }

        let results = match RuleKind::AddProductToBatch
            .decode(&response)
            .and_then(RuleResults::into_add_product)
        {
            Ok(r) => r,
            Err(e) => {
                error!(rule = %self.rule_name, error = %e, "产品校验结果解析失败");
                self.notifier.notify(Toast::generic_failure());
                self.reset_entry_form();
                return Err(e.into());
            }
        };

        for notification in &response.notifications {
            self.notifier.notify(Toast::from_notification(notification));
        }

        self.facility_candidates = results.facility_candidates().to_vec();
        let resolution =
            FacilityResolver::resolve(&self.facility_candidates, scan.registration_number.as_deref());

        if let FacilityResolution::NeedsRegistrationNumber(candidates) = &resolution {
            info!(
                unit_number = %scan.unit_number,
                candidates = candidates.len(),
                "来源设施不唯一，需要注册号"
            );
            self.entry_form.registration_number.require();
            return Ok(AddCandidateOutcome::RegistrationNumberRequired {
                candidates: candidates.len(),
            });
        }
        self.entry_form.registration_number.remove();

        let description_key = results.description_key().map(str::to_string);
        let Some(mut item) = results.import_item.into_iter().next() else {
            warn!(rule = %self.rule_name, "产品校验未返回产品");
            self.reset_entry_form();
            return Ok(AddCandidateOutcome::NoItemReturned);
        };

        if self.contains(&item.unit_number, &item.isbt_product_code) {
            self.reset_entry_form();
            return Ok(AddCandidateOutcome::Duplicate);
        }

        let index = self.items.len();
        item.id = index;
        if let Some(facility) = resolution.facility() {
            item.facility_identification = Some(facility.clone());
        }
        if description_key.is_some() {
            item.description_key = description_key;
        }
        if item.patient_record {
            self.patient_record_needed = true;
        }

        info!(index, unit_number = %item.unit_number, "产品加入批次");
        self.items.push(item);
        self.reset_entry_form();
        Ok(AddCandidateOutcome::Added { index })
    }

    fn build_request(&self, scan: &ProductScan, ctx: &BatchContext) -> RuleRequest {
        let mut request = RuleRequest::new(&self.rule_name)
            .with("unitNumber", json!(scan.unit_number))
            .with("bloodType", json!(scan.blood_type.option_value))
            .with("isbtProductCode", json!(scan.product_code))
            .with(
                "expirationDate",
                json!(scan.expiration_date.format("%Y-%m-%d").to_string()),
            )
            .with("facilityId", json!(ctx.facility_id))
            .with(
                "familyCategory",
                ctx.family_category.clone().map_or(Value::Null, Value::String),
            )
            .with("itemAttributes", json!(scan.attributes()));
        if let Some(reg) = scan.registration_number.as_deref().filter(|s| !s.is_empty()) {
            request = request.with("importFacilityIdentificationId", json!(reg));
        }
        request
    }

    // ===== 删除 =====

    pub fn remove(&mut self, index: usize) -> Option<BatchLineItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.patient_record_needed = self.items.iter().any(|i| i.patient_record);
        debug!(index, unit_number = %removed.unit_number, "产品移出批次");
        Some(removed)
    }

    pub fn remove_all(&mut self) {
        self.items.clear();
        self.patient_record_needed = false;
    }

    // ===== 患者 =====

    /// 关联或修改患者
    ///
    /// # 返回
    /// - Ok(true): 修改了已有患者
    /// - Ok(false): 首次关联
    pub fn associate_patient(&mut self, index: usize, patient: Patient) -> WorkflowResult<bool> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| WorkflowError::InvalidInput(format!("产品序号不存在: {}", index)))?;
        let edited = item.patient.is_some();
        item.patient = Some(patient);
        let message = if edited {
            messages::PATIENT_EDITED
        } else {
            messages::PATIENT_ASSOCIATED
        };
        self.notifier.notify(Toast::success(message));
        Ok(edited)
    }

    // ===== 重置 =====

    /// 重置录入表单；待补注册号时保留该字段
    pub fn reset_entry_form(&mut self) {
        let keep_registration = self.registration_number_needed();
        self.entry_form.reset(keep_registration);
    }

    /// 退出产品步骤：撤销注册号需求并清空表单
    pub fn clear_entry_state(&mut self) {
        self.entry_form.reset(false);
        self.facility_candidates.clear();
    }

    pub fn reset(&mut self) {
        self.remove_all();
        self.clear_entry_state();
    }
}
