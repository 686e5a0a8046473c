use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::ledger::{LedgerClient, SenderIdentity, TransferInstruction};
use crate::memo::Memo;
use crate::split::{compute_splits, SplitResult, SplitRule};

/// Which submission path a settlement took. Sequential means the
/// all-or-nothing guarantee was not in effect for that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    Atomic,
    Sequential,
}

/// One transfer that reached the ledger, with the hash it landed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedTransfer {
    pub to: String,
    pub amount: u128,
    pub tx_hash: String,
}

/// Outcome of one settlement attempt.
///
/// `submitted` lists the transfers that reached the ledger in split order;
/// on a partial failure it is the completed prefix and `success` is false.
/// The partial state is a plain value for the caller's retry layer to
/// inspect, not something reconstructed from an error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub order_id: String,
    pub success: bool,
    /// Canonical reference for the run: the batch hash on the atomic path,
    /// the first transfer's hash on the sequential path.
    pub tx_hash: Option<String>,
    pub path: Option<ExecutionPath>,
    pub splits: Vec<SplitResult>,
    pub submitted: Vec<SubmittedTransfer>,
    pub error: Option<String>,
}

/// Executes order settlements against the ledger as the fee-sponsoring
/// identity. The identity is injected per executor; callers own exactly one
/// handle per wallet.
pub struct SettlementExecutor {
    client: Arc<dyn LedgerClient>,
    sponsor: SenderIdentity,
}

impl SettlementExecutor {
    pub fn new(client: Arc<dyn LedgerClient>, sponsor: SenderIdentity) -> Self {
        Self { client, sponsor }
    }

    /// Settle an order: compute splits and submit them, atomically if the
    /// ledger allows it.
    ///
    /// Configuration errors (bad percentages) return `Err` before anything
    /// is submitted. Submission failures come back inside the result.
    pub async fn execute(
        &self,
        order_id: &str,
        total_amount: u128,
        rules: &[SplitRule],
        token: &str,
    ) -> AppResult<ExecutionResult> {
        let splits = compute_splits(total_amount, rules)?;
        Ok(self.execute_splits(order_id, splits, token).await)
    }

    /// Submit pre-computed splits without recomputing them. Retry paths use
    /// this to resubmit only a failed subset; the amounts are exactly what
    /// the original computation produced.
    pub async fn execute_splits(
        &self,
        order_id: &str,
        splits: Vec<SplitResult>,
        token: &str,
    ) -> ExecutionResult {
        let memo = Memo::for_order(order_id);
        let transfers: Vec<TransferInstruction> = splits
            .iter()
            .map(|s| TransferInstruction {
                to: s.to.clone(),
                amount: s.amount,
                token: token.to_string(),
                memo: Some(memo),
            })
            .collect();

        info!(
            "🔄 Settling order {} across {} split target(s)",
            order_id,
            splits.len()
        );

        match self.client.submit_batch(&self.sponsor, &transfers).await {
            Ok(tx_hash) => {
                info!("✓ Atomic batch landed for order {} (tx: {})", order_id, tx_hash);
                let submitted = transfers
                    .iter()
                    .map(|t| SubmittedTransfer {
                        to: t.to.clone(),
                        amount: t.amount,
                        tx_hash: tx_hash.clone(),
                    })
                    .collect();

                ExecutionResult {
                    order_id: order_id.to_string(),
                    success: true,
                    tx_hash: Some(tx_hash),
                    path: Some(ExecutionPath::Atomic),
                    splits,
                    submitted,
                    error: None,
                }
            }
            Err(batch_err) => {
                warn!(
                    "⚠️ Atomic batch rejected for order {}: {} - falling back to sequential transfers",
                    order_id, batch_err
                );
                self.execute_sequential(order_id, splits, transfers).await
            }
        }
    }

    /// Path B: submit each transfer individually, in split order. Partial
    /// completion is possible here; the result carries exactly how far the
    /// run got.
    async fn execute_sequential(
        &self,
        order_id: &str,
        splits: Vec<SplitResult>,
        transfers: Vec<TransferInstruction>,
    ) -> ExecutionResult {
        let mut submitted: Vec<SubmittedTransfer> = Vec::with_capacity(transfers.len());

        for instruction in &transfers {
            match self.client.submit_transfer(&self.sponsor, instruction).await {
                Ok(tx_hash) => submitted.push(SubmittedTransfer {
                    to: instruction.to.clone(),
                    amount: instruction.amount,
                    tx_hash,
                }),
                Err(err) => {
                    error!(
                        "❌ Sequential transfer to {} failed for order {} ({}/{} submitted): {}",
                        instruction.to,
                        order_id,
                        submitted.len(),
                        transfers.len(),
                        err
                    );
                    return ExecutionResult {
                        order_id: order_id.to_string(),
                        success: false,
                        tx_hash: None,
                        path: Some(ExecutionPath::Sequential),
                        splits,
                        submitted,
                        error: Some(err.to_string()),
                    };
                }
            }
        }

        // Every transfer landed, but not under one hash: the run settled
        // without the all-or-nothing guarantee.
        warn!(
            "⚠️ Order {} settled via sequential fallback ({} transfers, non-atomic)",
            order_id,
            submitted.len()
        );

        let canonical = submitted.first().map(|s| s.tx_hash.clone());
        ExecutionResult {
            order_id: order_id.to_string(),
            success: true,
            tx_hash: canonical,
            path: Some(ExecutionPath::Sequential),
            splits,
            submitted,
            error: None,
        }
    }
}
