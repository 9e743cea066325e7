// ==========================================
// 进口收货向导端到端测试
// ==========================================
// 测试目标: 表头 → 产品 → 完成 → 进度框关闭 的完整链路
// 外部协作者: 脚本化 mock (见 test_helpers)
// ==========================================


use chrono::{NaiveDate, NaiveTime};
use receiving_workflow::client::ClientError;
use receiving_workflow::domain::consequence::ConsequenceType;
use receiving_workflow::domain::shipment::{Temperature, TransitTime, TransitTimeRequest};
use receiving_workflow::domain::types::{category_values, TemperatureSign, WizardStep};
use receiving_workflow::domain::Patient;
use receiving_workflow::engine::{
    labels, messages, AddCandidateOutcome, BadgeColor, CompletionOutcome, CompletionPhase,
    InfoValue, PollerState, ProgressEvent, StepTransition, ToastLevel, WorkflowError,
};
use serde_json::json;
use std::time::Duration;
use test_helpers::*;

async fn enter_product_step(h: &mut ImportHarness, category: &str) {
    h.workflow.select_category(category).unwrap();
    h.workflow.set_inspection("ACCEPTABLE").unwrap();
    // 非隔离后果被过滤
    h.rules.push(info_results(json!([{
        "consequenceType": "RETURN_TO_INVENTORY",
        "consequenceReasonKey": "acceptable-shipment.label"
    }])));
    let transition = h.workflow.on_step_changed(1).await.unwrap();
    assert_eq!(
        transition,
        StepTransition::EnteredProductSelection {
            inspection_failed: false,
            has_quarantine: false
        }
    );
}

fn transit_time() -> TransitTime {
    TransitTime {
        request: TransitTimeRequest {
            transit_start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            transit_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            transit_start_time_zone: FACILITY_TZ.to_string(),
            transit_end_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            transit_end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            transit_end_time_zone: FACILITY_TZ.to_string(),
        },
        total_transit_time: "02 hours and 30 minutes".to_string(),
        result_key: Some("acceptable.label".to_string()),
        color: Some("green".to_string()),
    }
}

// ==========================================
// 冷冻类别完整流程
// ==========================================

#[tokio::test(start_paused = true)]
async fn test_frozen_import_happy_path() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;

    // 冷冻类别不需要温度/运输时长
    let info_request = h.rules.last_request().unwrap();
    assert_eq!(info_request.parameter("temperature"), Some(&json!("")));
    assert_eq!(info_request.parameter("isImport"), Some(&json!(true)));
    assert_eq!(info_request.parameter("productCategory"), Some(&json!("frozen.label")));
    assert_eq!(
        h.workflow.info_widget().inspection_badge().unwrap().1,
        BadgeColor::Green
    );

    h.rules
        .push(add_product_results("W0368240001", "E0869V00", false, single_facility()));
    let outcome = h.workflow.add_product(scan("W0368240001", "E0869V00")).await.unwrap();
    assert_eq!(outcome, AddCandidateOutcome::Added { index: 0 });

    let add_request = h.rules.last_request().unwrap();
    assert_eq!(add_request.parameter("bloodType"), Some(&json!("AP")));
    assert_eq!(add_request.parameter("expirationDate"), Some(&json!("2030-01-31")));
    assert_eq!(add_request.parameter("facilityId"), Some(&json!(FACILITY_ID)));
    assert_eq!(
        add_request.parameter("familyCategory"),
        Some(&json!(category_values::FROZEN))
    );

    let item = &h.workflow.batch().items()[0];
    assert_eq!(item.description_key.as_deref(), Some("apheresis-platelets.label"));
    assert_eq!(item.facility_identification.as_ref().unwrap().id, 7);

    h.rules
        .push(add_product_results("W0368240012", "E0869V00", false, single_facility()));
    let outcome = h.workflow.add_product(scan("W0368240012", "E0869V00")).await.unwrap();
    assert_eq!(outcome, AddCandidateOutcome::Added { index: 1 });
    assert!(!h.workflow.is_complete_disabled());

    h.completion.push_ticket(5);
    h.completion.push_status(status(2, 1, 0, false));
    h.completion.push_status(status(2, 2, 0, true));

    let outcome = h.workflow.complete().await.unwrap();
    assert_eq!(outcome, CompletionOutcome::Completed(status(2, 2, 0, true)));
    assert_eq!(h.completion.status_calls(), 2);
    assert_eq!(h.workflow.step(), WizardStep::Complete);
    assert!(matches!(
        h.workflow.completion_phase(),
        CompletionPhase::AwaitingClose(_)
    ));

    let events = h.progress.events();
    assert_eq!(events.first(), Some(&ProgressEvent::Opened));
    let snapshots = h.progress.snapshots();
    assert_eq!(snapshots.len(), 2);
    assert!(!snapshots[0].can_close);
    assert!(snapshots[1].can_close);
    assert_eq!((snapshots[1].processed, snapshots[1].quantity), (2, 2));

    let submission = &h.completion.submissions()[0];
    assert_eq!(submission.location_id, FACILITY_ID);
    assert_eq!(submission.transit_timezone.as_deref(), Some(FACILITY_TZ));
    assert_eq!(submission.shipment_inspect_key.as_deref(), Some("ACCEPTABLE"));
    let submitted = &submission.import_items[0];
    assert_eq!(submitted.product_consequence_key, ConsequenceType::ReturnToInventory);
    assert_eq!(submitted.license_number.as_deref(), Some("LIC-7"));
    assert_eq!(submitted.registration_number.as_deref(), Some("REG-7"));
    assert_eq!(submitted.status, "PENDING");
    assert!(submitted.import_item_consequences.is_empty());

    // 终态后不再轮询
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.completion.status_calls(), 2);

    let shown = h.workflow.on_progress_closed();
    assert_eq!(shown, vec![messages::IMPORT_COMPLETE]);
    assert_eq!(h.notifier.count_of(messages::IMPORT_COMPLETE), 1);
    assert_eq!(h.workflow.step(), WizardStep::Info);
    assert!(h.workflow.batch().is_empty());
    assert!(h.workflow.draft().category.is_none());
}

// ==========================================
// 冷藏类别 + 目检不合格 + 收货单隔离
// ==========================================

#[tokio::test(start_paused = true)]
async fn test_refrigerated_with_failed_inspection_quarantines_batch() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::REFRIGERATED).unwrap();
    h.workflow.set_inspection("UNACCEPTABLE").unwrap();
    assert!(!h.workflow.is_header_valid());

    h.workflow
        .set_temperature(Temperature::new(TemperatureSign::Plus, 4.0))
        .unwrap();
    assert!(h.workflow.is_header_valid());

    h.rules.push(info_results(json!([
        quarantine_consequence("failed-visual-inspection.label", Some("visualInspectKey"))
    ])));
    let transition = h.workflow.on_step_changed(1).await.unwrap();
    assert_eq!(
        transition,
        StepTransition::EnteredProductSelection {
            inspection_failed: true,
            has_quarantine: true
        }
    );
    assert_eq!(
        h.rules.last_request().unwrap().parameter("temperature"),
        Some(&json!(4.0))
    );

    let (keys, color) = h.workflow.info_widget().inspection_badge().unwrap();
    assert_eq!(keys.to_vec(), vec!["unacceptable.label".to_string()]);
    assert_eq!(color, BadgeColor::Red);
    let temperature = h.workflow.info_widget().entry(labels::TEMPERATURE).unwrap();
    assert_eq!(temperature.value, InfoValue::Text("+4".to_string()));

    h.rules
        .push(add_product_results("W0368240002", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240002", "E0869V00")).await.unwrap();

    let submission = h.workflow.build_submission();
    assert_eq!(submission.temperature.as_deref(), Some("+4"));
    let item = &submission.import_items[0];
    assert_eq!(item.product_consequence_key, ConsequenceType::Quarantine);
    assert_eq!(item.import_item_consequences.len(), 1);
    assert_eq!(
        item.import_item_consequences[0].item_consequence_reason_key,
        "failed-visual-inspection.label"
    );

    h.completion.push_ticket(9);
    h.completion.push_status(status(1, 1, 0, true));
    h.workflow.complete().await.unwrap();

    // 收货单隔离时只提示隔离文案
    let shown = h.workflow.on_progress_closed();
    assert_eq!(shown, vec![messages::IMPORT_COMPLETE_QUARANTINE]);
    assert_eq!(h.notifier.count_of(messages::IMPORT_COMPLETE), 0);
}

// ==========================================
// 室温类别: 运输时长参数与面板
// ==========================================

#[tokio::test]
async fn test_room_temperature_sends_transit_parameters() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::ROOM_TEMPERATURE).unwrap();
    h.workflow.set_inspection("ACCEPTABLE").unwrap();
    h.workflow
        .set_temperature(Temperature::new(TemperatureSign::Plus, 22.0))
        .unwrap();
    assert!(!h.workflow.is_header_valid());

    h.workflow.update_transit_time(transit_time()).unwrap();
    assert!(h.workflow.is_header_valid());

    h.rules.push(info_results(json!([])));
    h.workflow.on_step_changed(1).await.unwrap();

    let request = h.rules.last_request().unwrap();
    assert_eq!(request.parameter("transitStartDate"), Some(&json!("2024-06-01")));
    assert_eq!(request.parameter("transitEndTime"), Some(&json!("10:30")));
    assert_eq!(request.parameter("transitStartTimeZone"), Some(&json!(FACILITY_TZ)));

    let transit = h.workflow.info_widget().entry(labels::TRANSIT_TIME).unwrap();
    assert_eq!(transit.value, InfoValue::Text("2 hours 30 mins".to_string()));

    let submission = h.workflow.build_submission();
    assert_eq!(
        submission.total_transit_time.as_deref(),
        Some("02 hours and 30 minutes")
    );
    assert_eq!(
        submission.transit_start_date_time,
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(8, 0, 0)
    );
    assert_eq!(submission.transit_time_result_key.as_deref(), Some("acceptable.label"));
}

#[test]
fn test_transit_time_rejected_for_frozen_category() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::FROZEN).unwrap();
    let err = h.workflow.update_transit_time(transit_time()).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));
    assert!(h.workflow.select_category("NOT_A_CATEGORY").is_err());
}

// ==========================================
// 表头校验失败分支
// ==========================================

#[tokio::test]
async fn test_info_bad_request_stays_on_info_step() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::FROZEN).unwrap();
    h.workflow.set_inspection("ACCEPTABLE").unwrap();
    h.rules.push(bad_request());

    let transition = h.workflow.on_step_changed(1).await.unwrap();
    assert_eq!(transition, StepTransition::InfoRejected);
    assert_eq!(h.workflow.step(), WizardStep::Info);
    assert!(h.workflow.info_widget().is_empty());
    assert_eq!(h.notifier.count_of(messages::SOMETHING_WENT_WRONG), 1);
}

#[tokio::test]
async fn test_info_transport_error_leaves_state_unchanged() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::FROZEN).unwrap();
    h.workflow.set_inspection("ACCEPTABLE").unwrap();
    h.rules.push_error(ClientError::Transport("connection reset".to_string()));

    let err = h.workflow.on_step_changed(1).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Client(ClientError::Transport(_))));
    assert_eq!(h.workflow.step(), WizardStep::Info);
    assert!(h.workflow.shipment_consequences().is_empty());
    let toasts = h.notifier.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].level, ToastLevel::Error);
}

#[tokio::test]
async fn test_incomplete_header_blocks_step_change() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::FROZEN).unwrap();

    let err = h.workflow.on_step_changed(1).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidStepTransition { .. }));
    assert!(h.rules.requests().is_empty());

    let err = h.workflow.on_step_changed(2).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidStepTransition { .. }));
}

// ==========================================
// 退回表头 + 类别变化
// ==========================================

#[tokio::test]
async fn test_return_to_info_clears_values_and_category_change_clears_batch() {
    let mut h = import_harness();
    h.workflow.select_category(category_values::REFRIGERATED).unwrap();
    h.workflow.set_inspection("ACCEPTABLE").unwrap();
    h.workflow
        .set_temperature(Temperature::new(TemperatureSign::Minus, 2.0))
        .unwrap();
    h.rules.push(info_results(json!([])));
    h.workflow.on_step_changed(1).await.unwrap();

    h.rules
        .push(add_product_results("W0368240003", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240003", "E0869V00")).await.unwrap();

    let transition = h.workflow.on_step_changed(0).await.unwrap();
    assert_eq!(transition, StepTransition::ReturnedToInfo);
    assert!(h.workflow.draft().temperature.is_required());
    assert!(h.workflow.draft().temperature.value().is_none());
    assert!(h.workflow.info_widget().is_empty());
    // 同类别退回不清空批次
    assert_eq!(h.workflow.batch().len(), 1);

    h.workflow.select_category(category_values::FROZEN).unwrap();
    assert!(h.workflow.batch().is_empty());
    assert!(!h.workflow.draft().temperature.is_required());
}

// ==========================================
// 产品批次
// ==========================================

#[tokio::test]
async fn test_duplicate_scan_is_ignored_without_rule_call() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;

    h.rules
        .push(add_product_results("W0368240004", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240004", "E0869V00")).await.unwrap();
    let calls = h.rules.requests().len();

    let outcome = h.workflow.add_product(scan("W0368240004", "E0869V00")).await.unwrap();
    assert_eq!(outcome, AddCandidateOutcome::Duplicate);
    assert_eq!(h.rules.requests().len(), calls);
    assert_eq!(h.workflow.batch().len(), 1);
}

#[tokio::test]
async fn test_add_product_rejected_or_failed_leaves_batch_unchanged() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;

    h.rules.push(bad_request());
    let outcome = h.workflow.add_product(scan("W0368240005", "E0869V00")).await.unwrap();
    assert_eq!(outcome, AddCandidateOutcome::Rejected);

    h.rules.push_error(ClientError::UnexpectedStatus(503));
    assert!(h.workflow.add_product(scan("W0368240005", "E0869V00")).await.is_err());

    assert!(h.workflow.batch().is_empty());
    assert_eq!(h.notifier.count_of(messages::SOMETHING_WENT_WRONG), 2);
    assert!(h.workflow.batch().entry_form().unit_number.is_none());
}

#[tokio::test]
async fn test_add_product_requires_product_step() {
    let mut h = import_harness();
    let err = h
        .workflow
        .add_product(scan("W0368240006", "E0869V00"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed(_)));
    assert!(h.rules.requests().is_empty());
}

#[tokio::test]
async fn test_ambiguous_facility_requires_registration_number() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;

    h.rules
        .push(add_product_results("W0368240007", "E0869V00", false, two_facilities()));
    let outcome = h.workflow.add_product(scan("W0368240007", "E0869V00")).await.unwrap();
    assert_eq!(
        outcome,
        AddCandidateOutcome::RegistrationNumberRequired { candidates: 2 }
    );
    assert!(h.workflow.batch().is_empty());
    assert!(h.workflow.batch().registration_number_needed());
    assert_eq!(h.workflow.batch().facility_candidates().len(), 2);
    // 表单保留以便补注册号后重试
    assert_eq!(
        h.workflow.batch().entry_form().unit_number.as_deref(),
        Some("W0368240007")
    );

    assert!(h
        .workflow
        .batch_mut()
        .entry_form_mut()
        .registration_number
        .fill("REG-8".to_string()));
    h.rules
        .push(add_product_results("W0368240007", "E0869V00", false, two_facilities()));
    let outcome = h.workflow.add_product_from_entry_form().await.unwrap();
    assert_eq!(outcome, AddCandidateOutcome::Added { index: 0 });

    let request = h.rules.last_request().unwrap();
    assert_eq!(
        request.parameter("importFacilityIdentificationId"),
        Some(&json!("REG-8"))
    );
    let item = &h.workflow.batch().items()[0];
    assert_eq!(item.facility_identification.as_ref().unwrap().id, 8);
    assert!(!h.workflow.batch().registration_number_needed());
}

#[tokio::test]
async fn test_patient_record_gates_completion() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;

    h.rules
        .push(add_product_results("W0368240008", "E0869V00", true, single_facility()));
    h.workflow.add_product(scan("W0368240008", "E0869V00")).await.unwrap();
    assert!(h.workflow.batch().patient_record_needed());
    assert!(h.workflow.is_complete_disabled());

    let err = h.workflow.complete().await.unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed(_)));
    assert!(h.completion.submissions().is_empty());

    let patient = Patient {
        id: 31,
        first_name: Some("Ana".to_string()),
        last_name: Some("Diaz".to_string()),
        record_number: Some("MRN-31".to_string()),
    };
    assert!(!h.workflow.associate_patient(0, patient.clone()).unwrap());
    assert!(h.workflow.associate_patient(0, patient).unwrap());
    assert_eq!(h.notifier.count_of(messages::PATIENT_ASSOCIATED), 1);
    assert_eq!(h.notifier.count_of(messages::PATIENT_EDITED), 1);
    assert!(!h.workflow.is_complete_disabled());
    assert_eq!(h.workflow.build_submission().import_items[0].patient_id, Some(31));

    h.workflow.remove_product(0).unwrap();
    assert!(!h.workflow.batch().patient_record_needed());
    assert!(h.workflow.remove_product(0).is_err());
}

// ==========================================
// 完成流程异常
// ==========================================

#[tokio::test(start_paused = true)]
async fn test_status_error_force_closes_progress() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;
    h.rules
        .push(add_product_results("W0368240009", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240009", "E0869V00")).await.unwrap();

    h.completion.push_ticket(11);
    h.completion.push_status(status(1, 0, 0, false));
    h.completion
        .push_status_error(ClientError::Transport("timeout".to_string()));

    assert!(h.workflow.complete().await.is_err());
    assert!(h.progress.was_force_closed());
    assert_eq!(h.notifier.count_of(messages::SOMETHING_WENT_WRONG), 1);
    assert_eq!(h.workflow.poller_state(), &PollerState::Failed);
    assert_eq!(h.workflow.completion_phase(), &CompletionPhase::Idle);
    assert_eq!(h.workflow.step(), WizardStep::ProductSelection);
    // 失败后不提示成功
    assert!(h.workflow.on_progress_closed().is_empty());
    assert_eq!(h.workflow.batch().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_error_never_opens_progress() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;
    h.rules
        .push(add_product_results("W0368240010", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240010", "E0869V00")).await.unwrap();

    h.completion.push_ticket_error(ClientError::UnexpectedStatus(500));
    assert!(h.workflow.complete().await.is_err());
    assert!(h.progress.events().is_empty());
    assert_eq!(h.completion.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_completion_can_be_retried() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;
    h.rules
        .push(add_product_results("W0368240012", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240012", "E0869V00")).await.unwrap();

    // 状态一直停留在进行中，宿主超时后丢弃 complete
    h.completion.push_ticket(21);
    let timed_out = tokio::time::timeout(Duration::from_secs(10), h.workflow.complete()).await;
    assert!(timed_out.is_err());
    assert_eq!(h.progress.events().last(), Some(&ProgressEvent::ForceClosed));
    assert!(!h.workflow.is_complete_disabled());

    assert!(h.workflow.recover_interrupted_completion());
    assert_eq!(h.workflow.completion_phase(), &CompletionPhase::Idle);
    assert_eq!(h.workflow.step(), WizardStep::ProductSelection);
    assert_eq!(h.workflow.poller_state(), &PollerState::Idle);
    assert!(!h.workflow.recover_interrupted_completion());

    let calls = h.completion.status_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.completion.status_calls(), calls);

    h.completion.push_ticket(22);
    h.completion.push_status(status(1, 1, 0, true));
    let outcome = h.workflow.complete().await.unwrap();
    assert_eq!(outcome, CompletionOutcome::Completed(status(1, 1, 0, true)));
    assert_eq!(h.completion.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_session_cancel_stops_polling() {
    let mut h = import_harness();
    enter_product_step(&mut h, category_values::FROZEN).await;
    h.rules
        .push(add_product_results("W0368240011", "E0869V00", false, single_facility()));
    h.workflow.add_product(scan("W0368240011", "E0869V00")).await.unwrap();

    // 状态队列为空时 mock 持续返回进行中
    h.completion.push_ticket(12);
    let session = h.session.clone();
    let (outcome, _) = tokio::join!(h.workflow.complete(), async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        session.cancel();
    });

    assert_eq!(outcome.unwrap(), CompletionOutcome::Cancelled);
    assert!(h.progress.was_force_closed());
    assert_eq!(h.workflow.poller_state(), &PollerState::Cancelled);
    assert_eq!(h.workflow.step(), WizardStep::ProductSelection);

    let calls = h.completion.status_calls();
    assert!(calls >= 3);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.completion.status_calls(), calls);
}
