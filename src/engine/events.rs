// ==========================================
// 血液配送收货系统 - 引擎层用户反馈出口
// ==========================================
// 职责: 定义提示框 (Notifier) 与进度框 (ProgressIndicator) trait
// 说明: Engine 层定义 trait，宿主界面实现适配器
// ==========================================

use crate::client::rule_client::Notification;
use crate::domain::completion::ProgressSnapshot;
use crate::domain::types::NotificationType;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 提示文案键
pub mod messages {
    pub const SOMETHING_WENT_WRONG: &str = "something-went-wrong.label";
    pub const IMPORT_COMPLETE: &str = "import-process-complete.label";
    pub const IMPORT_COMPLETE_QUARANTINE: &str = "import-process-complete-quarantine.label";
    pub const PATIENT_ASSOCIATED: &str = "patient-record-associated-import-product.label";
    pub const PATIENT_EDITED: &str = "patient-record-edited-successfully.label";
    pub const ORDER_NOT_FOUND: &str = "the-order-number-not-exist.message";
    pub const TRANSFER_COMPLETE: &str = "transfer-complete.message";
    pub const TRANSFER_QUARANTINED: &str = "transfer-receipt-products-quarantined.label";
    pub const SUCCESS_TITLE: &str = "success.label";
    pub const WARNING_TITLE: &str = "warning.label";
    pub const ERROR_TITLE: &str = "error.label";
}

// ==========================================
// Toast - 提示框
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl From<NotificationType> for ToastLevel {
    fn from(t: NotificationType) -> Self {
        match t {
            NotificationType::Success => ToastLevel::Success,
            NotificationType::Warning => ToastLevel::Warning,
            NotificationType::Error => ToastLevel::Error,
            NotificationType::Info | NotificationType::Other => ToastLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    /// 文案或文案键（由界面翻译）
    pub message: String,
    pub title: Option<String>,
}

impl Toast {
    pub fn new(level: ToastLevel, message: &str) -> Self {
        Self {
            level,
            message: message.to_string(),
            title: None,
        }
    }

    pub fn success(message: &str) -> Self {
        Self::new(ToastLevel::Success, message).with_title(messages::SUCCESS_TITLE)
    }

    pub fn warning(message: &str) -> Self {
        Self::new(ToastLevel::Warning, message).with_title(messages::WARNING_TITLE)
    }

    pub fn error(message: &str) -> Self {
        Self::new(ToastLevel::Error, message).with_title(messages::ERROR_TITLE)
    }

    /// 通用失败提示
    pub fn generic_failure() -> Self {
        Self::error(messages::SOMETHING_WENT_WRONG)
    }

    /// 规则通知原样呈现
    pub fn from_notification(notification: &Notification) -> Self {
        Self::new(notification.notification_type.into(), &notification.message)
            .with_title(notification.notification_type.title())
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

// ==========================================
// Notifier Trait
// ==========================================
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// 空操作提示出口
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, toast: Toast) {
        tracing::debug!(level = ?toast.level, message = %toast.message, "NoOpNotifier: 跳过提示");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 收集型提示出口（无界面运行/测试）
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        lock(&self.toasts).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.toasts).iter().map(|t| t.message.clone()).collect()
    }

    pub fn count_of(&self, message: &str) -> usize {
        lock(&self.toasts)
            .iter()
            .filter(|t| t.message == message)
            .count()
    }

    pub fn clear(&self) {
        lock(&self.toasts).clear();
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, toast: Toast) {
        lock(&self.toasts).push(toast);
    }
}

// ==========================================
// ProgressIndicator Trait
// ==========================================
pub trait ProgressIndicator: Send + Sync {
    /// 打开进度框
    fn open(&self);

    /// 每个轮询周期刷新
    fn update(&self, snapshot: &ProgressSnapshot);

    /// 错误/取消时强制关闭
    fn force_close(&self);
}

#[derive(Debug, Clone, Default)]
pub struct NoOpProgressIndicator;

impl ProgressIndicator for NoOpProgressIndicator {
    fn open(&self) {}

    fn update(&self, snapshot: &ProgressSnapshot) {
        tracing::debug!(
            processed = snapshot.processed,
            quantity = snapshot.quantity,
            "NoOpProgressIndicator: 跳过进度刷新"
        );
    }

    fn force_close(&self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Opened,
    Updated(ProgressSnapshot),
    ForceClosed,
}

/// 收集型进度出口
#[derive(Debug, Default)]
pub struct CollectingProgressIndicator {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingProgressIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        lock(&self.events).clone()
    }

    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Updated(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn was_force_closed(&self) -> bool {
        lock(&self.events).contains(&ProgressEvent::ForceClosed)
    }
}

impl ProgressIndicator for CollectingProgressIndicator {
    fn open(&self) {
        lock(&self.events).push(ProgressEvent::Opened);
    }

    fn update(&self, snapshot: &ProgressSnapshot) {
        lock(&self.events).push(ProgressEvent::Updated(snapshot.clone()));
    }

    fn force_close(&self) {
        lock(&self.events).push(ProgressEvent::ForceClosed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_from_notification() {
        let n = Notification::new(NotificationType::Warning, "unit-expired.label");
        let toast = Toast::from_notification(&n);
        assert_eq!(toast.level, ToastLevel::Warning);
        assert_eq!(toast.message, "unit-expired.label");
        assert_eq!(toast.title.as_deref(), Some("Warning"));
    }

    #[test]
    fn test_collecting_notifier() {
        let notifier = CollectingNotifier::new();
        notifier.notify(Toast::generic_failure());
        notifier.notify(Toast::success(messages::IMPORT_COMPLETE));
        assert_eq!(notifier.count_of(messages::SOMETHING_WENT_WRONG), 1);
        assert_eq!(notifier.toasts()[0].level, ToastLevel::Error);

        notifier.clear();
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_collecting_progress() {
        let progress = CollectingProgressIndicator::new();
        progress.open();
        progress.force_close();
        assert!(progress.was_force_closed());
        assert!(progress.snapshots().is_empty());
    }
}
