// ==========================================
// 血液配送收货系统 - 调拨服务客户端 Trait
// ==========================================
// 职责: 调拨单查询、来源设施、发货/收货记录、创建调拨收货单
// 约定: 创建接口返回非 201 时，实现方映射为 ClientError::UnexpectedStatus
// ==========================================

use crate::client::error::ClientResult;
use crate::domain::transfer::{
    OriginFacility, ShipmentRecord, TransferOrder, TransferReceipt, TransferReceiptSubmission,
};
use async_trait::async_trait;

#[async_trait]
pub trait TransferReceiptClient: Send + Sync {
    /// 按单号查询调拨单，不存在返回 None
    async fn find_order_by_number(&self, order_number: &str) -> ClientResult<Option<TransferOrder>>;

    async fn get_facility(&self, location_id: i64) -> ClientResult<OriginFacility>;

    async fn list_shipments(&self, order_id: i64) -> ClientResult<Vec<ShipmentRecord>>;

    async fn list_transfer_receipts(&self, order_id: i64) -> ClientResult<Vec<TransferReceipt>>;

    async fn create_transfer_receipt(
        &self,
        submission: &TransferReceiptSubmission,
    ) -> ClientResult<TransferReceipt>;
}
