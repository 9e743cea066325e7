// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 配置文件加载、环境变量覆写、WorkflowSettings 装配
// ==========================================

use receiving_workflow::config::{
    config_keys, ConfigError, ConfigManager, WorkflowConfigReader, WorkflowSettings,
};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

#[tokio::test]
async fn test_defaults_without_file() {
    let settings = WorkflowSettings::load(&ConfigManager::new())
        .await
        .expect("Failed to load settings");

    assert_eq!(settings, WorkflowSettings::default());
    assert_eq!(settings.import_info_rule, "imports-information-validation");
    assert_eq!(settings.inspection_result_property, "visualInspectKey");
    assert_eq!(settings.status_poll_interval, Duration::from_secs(3));
    assert_eq!(settings.order_number_max_length, 50);
}

#[tokio::test]
async fn test_load_from_file() {
    let file = write_config(
        r#"{
            "rule.import_information": "imports-information-validation-v2",
            "completion.status_poll_interval_ms": 1500,
            "transfer.comments_max_length": "250",
            "__meta_exported_at": "2024-06-01T00:00:00Z"
        }"#,
    );

    let manager = ConfigManager::from_file(file.path()).expect("Failed to load config");
    let settings = WorkflowSettings::load(&manager)
        .await
        .expect("Failed to load settings");

    assert_eq!(settings.import_info_rule, "imports-information-validation-v2");
    assert_eq!(settings.status_poll_interval, Duration::from_millis(1500));
    assert_eq!(settings.transfer_comments_max_length, 250);
    // 未配置的键回退默认值
    assert_eq!(settings.comments_max_length, 1000);
    assert!(manager
        .get_config_value("__meta_exported_at")
        .unwrap()
        .is_none());
}

#[test]
fn test_missing_or_malformed_file() {
    let missing = ConfigManager::from_file(std::path::Path::new("/nonexistent/receiving.json"));
    assert!(matches!(missing, Err(ConfigError::FileRead { .. })));

    let file = write_config("{ not json");
    let malformed = ConfigManager::from_file(file.path());
    assert!(matches!(malformed, Err(ConfigError::Parse(_))));
}

#[tokio::test]
async fn test_env_override_wins_over_file() {
    let file = write_config(r#"{"transfer.order_number_max_length": 40}"#);
    let manager = ConfigManager::from_file(file.path()).expect("Failed to load config");
    assert_eq!(manager.get_order_number_max_length().await.unwrap(), 40);

    std::env::set_var("RECEIVING_WORKFLOW_TRANSFER_ORDER_NUMBER_MAX_LENGTH", "64");
    let applied = manager.apply_env_overrides().unwrap();
    std::env::remove_var("RECEIVING_WORKFLOW_TRANSFER_ORDER_NUMBER_MAX_LENGTH");

    assert!(applied >= 1);
    assert_eq!(manager.get_order_number_max_length().await.unwrap(), 64);
}

#[tokio::test]
async fn test_invalid_numeric_value_is_reported() {
    let manager = ConfigManager::new();
    manager
        .set_config_value(config_keys::STATUS_POLL_INTERVAL_MS, "soon")
        .unwrap();

    let err = WorkflowSettings::load(&manager).await.unwrap_err();
    match err {
        ConfigError::InvalidValue { key, value, .. } => {
            assert_eq!(key, config_keys::STATUS_POLL_INTERVAL_MS);
            assert_eq!(value, "soon");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_snapshot_restores_into_fresh_manager() {
    let manager = ConfigManager::new();
    manager
        .set_config_value(config_keys::TRANSFER_PRODUCT_RULE, "rul-0117-v2")
        .unwrap();
    let snapshot = manager.get_config_snapshot().unwrap();

    let restored = ConfigManager::new();
    assert_eq!(restored.restore_config_from_snapshot(&snapshot).unwrap(), 1);
    assert_eq!(
        restored.get_transfer_product_rule().await.unwrap(),
        "rul-0117-v2"
    );
}
