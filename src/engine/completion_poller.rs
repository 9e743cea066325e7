// ==========================================
// 血液配送收货系统 - 完成轮询
// ==========================================
// 状态: Idle → Submitting → Polling → Completed | Failed | Cancelled
// 规则: 提交成功后立即查询并按固定间隔重复查询
//       观察到 COMPLETED 时先交付该周期数据再停止
//       错误时通用提示 + 强制关闭进度框 + 返回错误
// 取消: 取消令牌触发时停止，不再发出请求
//       run 的 future 被丢弃时进度框同样强制关闭
// ==========================================

use crate::client::completion_client::ImportCompletionClient;
use crate::domain::completion::{CompletionStatus, ImportSubmission, ProgressSnapshot};
use crate::engine::error::WorkflowResult;
use crate::engine::events::{Notifier, ProgressIndicator, Toast};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq)]
pub enum PollerState {
    Idle,
    Submitting,
    Polling { completion_id: i64 },
    Completed(CompletionStatus),
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(CompletionStatus),
    Cancelled,
}

/// 进度框守卫：未到终态即离开作用域时强制关闭
struct OpenProgress {
    progress: Arc<dyn ProgressIndicator>,
    armed: bool,
}

impl OpenProgress {
    fn open(progress: &Arc<dyn ProgressIndicator>) -> Self {
        progress.open();
        Self {
            progress: Arc::clone(progress),
            armed: true,
        }
    }

    /// 终态已交付，进度框交由用户关闭
    fn release(mut self) {
        self.armed = false;
    }
}

impl Drop for OpenProgress {
    fn drop(&mut self) {
        if self.armed {
            self.progress.force_close();
        }
    }
}

pub struct CompletionPoller {
    client: Arc<dyn ImportCompletionClient>,
    notifier: Arc<dyn Notifier>,
    progress: Arc<dyn ProgressIndicator>,
    interval: Duration,
    state: PollerState,
}

impl CompletionPoller {
    pub fn new(
        client: Arc<dyn ImportCompletionClient>,
        notifier: Arc<dyn Notifier>,
        progress: Arc<dyn ProgressIndicator>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            notifier,
            progress,
            interval,
            state: PollerState::Idle,
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            PollerState::Submitting | PollerState::Polling { .. }
        )
    }

    pub fn reset(&mut self) {
        self.state = PollerState::Idle;
    }

    /// 提交并轮询至终态
    pub async fn run(
        &mut self,
        submission: &ImportSubmission,
        cancel: &CancellationToken,
    ) -> WorkflowResult<PollOutcome> {
        self.state = PollerState::Submitting;

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(self.cancelled()),
            res = self.client.complete_import(submission) => res,
        };
        let ticket = match submitted {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "完成命令提交失败");
                self.notifier.notify(Toast::generic_failure());
                self.state = PollerState::Failed;
                return Err(e.into());
            }
        };

        let completion_id = ticket.id;
        info!(completion_id, items = submission.import_items.len(), "完成命令已提交，开始轮询");
        let open_progress = OpenProgress::open(&self.progress);
        self.state = PollerState::Polling { completion_id };

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled()),
                _ = ticker.tick() => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled()),
                res = self.client.get_import_status(completion_id) => res,
            };

            match polled {
                Ok(status) => {
                    debug!(
                        completion_id,
                        processed = status.processed(),
                        total = status.total_items,
                        status = %status.status,
                        "完成状态"
                    );
                    self.progress.update(&ProgressSnapshot::from(&status));
                    if status.is_terminal() {
                        info!(
                            completion_id,
                            success = status.total_success,
                            failure = status.total_failure,
                            "完成流程结束"
                        );
                        self.state = PollerState::Completed(status.clone());
                        open_progress.release();
                        return Ok(PollOutcome::Completed(status));
                    }
                }
                Err(e) => {
                    error!(completion_id, error = %e, "完成状态查询失败");
                    self.notifier.notify(Toast::generic_failure());
                    self.state = PollerState::Failed;
                    return Err(e.into());
                }
            }
        }
    }

    fn cancelled(&mut self) -> PollOutcome {
        info!("完成轮询已取消");
        self.state = PollerState::Cancelled;
        PollOutcome::Cancelled
    }
}
