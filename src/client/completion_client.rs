// ==========================================
// 血液配送收货系统 - 完成服务客户端 Trait
// ==========================================
// 职责: 提交进口完成命令、查询完成状态（不包含实现）
// ==========================================

use crate::client::error::ClientResult;
use crate::domain::completion::{CompletionStatus, CompletionTicket, ImportSubmission};
use async_trait::async_trait;

#[async_trait]
pub trait ImportCompletionClient: Send + Sync {
    /// 提交完成命令，返回完成标识 { id }
    async fn complete_import(&self, submission: &ImportSubmission) -> ClientResult<CompletionTicket>;

    /// 查询完成状态
    async fn get_import_status(&self, completion_id: i64) -> ClientResult<CompletionStatus>;
}
