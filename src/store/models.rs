use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::split::SplitRule;

/// Order lifecycle: pending -> processing -> settled | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Settled,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Settled => "settled",
            OrderStatus::Failed => "failed",
        }
    }
}

/// A payment obligation to settle. The web/commerce fields live elsewhere;
/// only what the settlement core touches is modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub token: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: &str, amount: Decimal, token: &str) -> Self {
        Self {
            id: id.to_string(),
            amount,
            token: token.to_string(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn can_settle(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, OrderStatus::Settled | OrderStatus::Failed)
    }
}

/// Netting run lifecycle: executing -> completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NettingRunStatus {
    Executing,
    Completed,
    Failed,
}

impl NettingRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NettingRunStatus::Executing => "executing",
            NettingRunStatus::Completed => "completed",
            NettingRunStatus::Failed => "failed",
        }
    }
}

/// One execution attempt of an order settlement. The split parameters are
/// snapshotted on the run so a retry re-uses exactly what the original
/// attempt computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NettingRun {
    pub id: Uuid,
    pub order_id: String,
    pub token: String,
    pub total_amount: u128,
    pub rules: Vec<SplitRule>,
    pub status: NettingRunStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NettingRun {
    pub fn new(order_id: &str, token: &str, total_amount: u128, rules: Vec<SplitRule>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            token: token.to_string(),
            total_amount,
            rules,
            status: NettingRunStatus::Executing,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == NettingRunStatus::Completed
    }
}

/// Transaction lifecycle: pending -> confirmed | failed.
/// A record moves to confirmed at most once, keyed by tx hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// One transfer leg owned by a netting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub to_address: String,
    pub amount: u128,
    pub token: String,
    /// Hex-encoded memo as it went on the wire
    pub memo: String,
    pub tx_hash: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(run_id: Uuid, to_address: &str, amount: u128, token: &str, memo: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            to_address: to_address.to_string(),
            amount,
            token: token.to_string(),
            memo: memo.to_string(),
            tx_hash: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn mark_confirmed(mut self, tx_hash: &str) -> Self {
        self.tx_hash = Some(tx_hash.to_string());
        self.status = TransactionStatus::Confirmed;
        self
    }

    pub fn mark_failed(mut self) -> Self {
        self.status = TransactionStatus::Failed;
        self
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == TransactionStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_settle_guard() {
        let mut order = Order::new("ord-1", dec!(10), "0xtoken");
        assert!(order.can_settle());

        order.status = OrderStatus::Processing;
        assert!(!order.can_settle());
        assert!(!order.is_terminal());

        order.status = OrderStatus::Settled;
        assert!(order.is_terminal());
    }

    #[test]
    fn test_transaction_confirmation_transition() {
        let run = NettingRun::new("ord-1", "0xtoken", 1_000, vec![]);
        let tx = TransactionRecord::new(run.id, "0xaaa", 1_000, "0xtoken", "0x00");
        assert_eq!(tx.status, TransactionStatus::Pending);

        let tx = tx.mark_confirmed("0xabc");
        assert!(tx.is_confirmed());
        assert_eq!(tx.tx_hash.as_deref(), Some("0xabc"));
    }
}
