use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::models::{
    NettingRun, NettingRunStatus, Order, OrderStatus, TransactionRecord, TransactionStatus,
};
use crate::store::repository::SettlementRepository;

#[derive(Default)]
struct Inner {
    orders: HashMap<String, Order>,
    runs: HashMap<Uuid, NettingRun>,
    transactions: HashMap<Uuid, TransactionRecord>,
}

/// In-memory settlement store. Backs the test suites and embeddings that
/// do not bring their own database.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&self, order: Order) {
        self.inner.write().orders.insert(order.id.clone(), order);
    }
}

#[async_trait]
impl SettlementRepository for InMemoryRepository {
    async fn order(&self, order_id: &str) -> AppResult<Option<Order>> {
        Ok(self.inner.read().orders.get(order_id).cloned())
    }

    async fn find_order_by_prefix(&self, prefix: &str) -> AppResult<Option<Order>> {
        let inner = self.inner.read();
        let mut matches: Vec<&Order> = inner
            .orders
            .values()
            .filter(|o| o.id.starts_with(prefix))
            .collect();
        // Deterministic "first match" for colliding prefixes
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches.first().map(|o| (*o).clone()))
    }

    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> AppResult<()> {
        let mut inner = self.inner.write();
        if let Some(order) = inner.orders.get_mut(order_id) {
            if order.status != status {
                order.status = status;
                order.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn insert_netting_run(&self, run: &NettingRun) -> AppResult<()> {
        self.inner.write().runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn netting_run(&self, run_id: Uuid) -> AppResult<Option<NettingRun>> {
        Ok(self.inner.read().runs.get(&run_id).cloned())
    }

    async fn latest_netting_run(&self, order_id: &str) -> AppResult<Option<NettingRun>> {
        let inner = self.inner.read();
        Ok(inner
            .runs
            .values()
            .filter(|r| r.order_id == order_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn set_netting_run_status(
        &self,
        run_id: Uuid,
        status: NettingRunStatus,
    ) -> AppResult<()> {
        let mut inner = self.inner.write();
        if let Some(run) = inner.runs.get_mut(&run_id) {
            if run.status != status {
                run.status = status;
                if status == NettingRunStatus::Completed {
                    run.completed_at = Some(Utc::now());
                }
            }
        }
        Ok(())
    }

    async fn insert_transaction(&self, tx: &TransactionRecord) -> AppResult<()> {
        self.inner.write().transactions.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn run_transactions(&self, run_id: Uuid) -> AppResult<Vec<TransactionRecord>> {
        let inner = self.inner.read();
        let mut txs: Vec<TransactionRecord> = inner
            .transactions
            .values()
            .filter(|t| t.run_id == run_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(txs)
    }

    async fn find_confirmed_transaction(
        &self,
        tx_hash: &str,
    ) -> AppResult<Option<TransactionRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .transactions
            .values()
            .find(|t| t.status == TransactionStatus::Confirmed && t.tx_hash.as_deref() == Some(tx_hash))
            .cloned())
    }

    async fn set_transaction_status(
        &self,
        tx_id: Uuid,
        tx_hash: Option<String>,
        status: TransactionStatus,
    ) -> AppResult<()> {
        let mut inner = self.inner.write();
        if let Some(tx) = inner.transactions.get_mut(&tx_id) {
            if tx.status != status {
                tx.status = status;
                if tx_hash.is_some() {
                    tx.tx_hash = tx_hash;
                }
            }
        }
        Ok(())
    }

    async fn confirm_unhashed_transactions(&self, run_id: Uuid, tx_hash: &str) -> AppResult<u64> {
        let mut inner = self.inner.write();
        let mut changed = 0;
        for tx in inner.transactions.values_mut() {
            if tx.run_id == run_id && tx.tx_hash.is_none() {
                tx.tx_hash = Some(tx_hash.to_string());
                tx.status = TransactionStatus::Confirmed;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_order_status_update_is_idempotent() {
        let repo = InMemoryRepository::new();
        repo.insert_order(Order::new("ord-1", dec!(25), "0xtoken"));

        repo.set_order_status("ord-1", OrderStatus::Settled)
            .await
            .unwrap();
        let first = repo.order("ord-1").await.unwrap().unwrap();

        repo.set_order_status("ord-1", OrderStatus::Settled)
            .await
            .unwrap();
        let second = repo.order("ord-1").await.unwrap().unwrap();

        assert_eq!(first.status, OrderStatus::Settled);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn test_prefix_lookup_prefers_oldest_match() {
        let repo = InMemoryRepository::new();
        let mut older = Order::new("abcd1111", dec!(1), "0xtoken");
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        repo.insert_order(older);
        repo.insert_order(Order::new("abcd2222", dec!(2), "0xtoken"));

        let found = repo.find_order_by_prefix("abcd").await.unwrap().unwrap();
        assert_eq!(found.id, "abcd1111");
    }

    #[tokio::test]
    async fn test_confirm_unhashed_only_touches_hashless_rows() {
        let repo = InMemoryRepository::new();
        let run = NettingRun::new("ord-1", "0xtoken", 100, vec![]);
        repo.insert_netting_run(&run).await.unwrap();

        let pending = TransactionRecord::new(run.id, "0xaaa", 60, "0xtoken", "0x00");
        let confirmed =
            TransactionRecord::new(run.id, "0xbbb", 40, "0xtoken", "0x00").mark_confirmed("0x111");
        repo.insert_transaction(&pending).await.unwrap();
        repo.insert_transaction(&confirmed).await.unwrap();

        let changed = repo
            .confirm_unhashed_transactions(run.id, "0x222")
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let txs = repo.run_transactions(run.id).await.unwrap();
        assert!(txs.iter().all(|t| t.is_confirmed()));
        assert!(txs.iter().any(|t| t.tx_hash.as_deref() == Some("0x111")));
    }
}
