use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::models::{
    NettingRun, NettingRunStatus, Order, OrderStatus, TransactionRecord, TransactionStatus,
};

/// Repository over the externally-owned settlement rows.
///
/// Every mutation is an idempotent "set field X if not already X": applying
/// the same update twice leaves the row as if applied once. Reconciliation
/// relies on this; the same confirmation may be delivered many times.
#[async_trait]
pub trait SettlementRepository: Send + Sync {
    async fn order(&self, order_id: &str) -> AppResult<Option<Order>>;

    /// Prefix match over order ids. Memos carry only a truncated 8-char
    /// prefix, so with enough concurrent orders collisions are possible;
    /// implementations return the first match.
    async fn find_order_by_prefix(&self, prefix: &str) -> AppResult<Option<Order>>;

    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> AppResult<()>;

    async fn insert_netting_run(&self, run: &NettingRun) -> AppResult<()>;

    async fn netting_run(&self, run_id: Uuid) -> AppResult<Option<NettingRun>>;

    /// Most recently created run for an order.
    async fn latest_netting_run(&self, order_id: &str) -> AppResult<Option<NettingRun>>;

    async fn set_netting_run_status(
        &self,
        run_id: Uuid,
        status: NettingRunStatus,
    ) -> AppResult<()>;

    async fn insert_transaction(&self, tx: &TransactionRecord) -> AppResult<()>;

    async fn run_transactions(&self, run_id: Uuid) -> AppResult<Vec<TransactionRecord>>;

    /// The idempotency probe: a transaction already confirmed under this
    /// hash means the event was processed before.
    async fn find_confirmed_transaction(&self, tx_hash: &str)
        -> AppResult<Option<TransactionRecord>>;

    async fn set_transaction_status(
        &self,
        tx_id: Uuid,
        tx_hash: Option<String>,
        status: TransactionStatus,
    ) -> AppResult<()>;

    /// Confirm every transaction of a run that has no hash yet, attaching
    /// the observed hash. Returns how many rows changed.
    async fn confirm_unhashed_transactions(&self, run_id: Uuid, tx_hash: &str) -> AppResult<u64>;
}
