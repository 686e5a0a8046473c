// Reconciliation - matching observed on-chain transfers back to pending
// settlement state, exactly once per confirmed transaction.

pub mod watcher;

pub use watcher::{ReconciliationWatcher, WatcherHandle};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::ledger::TransferEvent;
use crate::memo::{Memo, MemoKind};
use crate::store::{NettingRunStatus, OrderStatus, SettlementRepository};

/// Outcome of reconciling one observed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A transaction is already confirmed under this hash: the event is a
    /// redelivery and nothing was mutated.
    AlreadyProcessed,
    /// First-seen confirmation; the order and its latest run were updated.
    Reconciled { order_id: String },
    /// No resolvable memo or order. Not a failure, just unmatched traffic;
    /// agent-payment and subscription memos land here because other
    /// collaborators own those flows.
    Unmatched { memo_kind: MemoKind },
}

/// Reconcile one transfer event against pending settlement state.
///
/// The confirmed-hash probe is the sole guard against double processing:
/// however many times the transport redelivers an event, state flips at
/// most once.
pub async fn reconcile_event(
    repo: &dyn SettlementRepository,
    event: &TransferEvent,
) -> AppResult<ReconcileOutcome> {
    if event.tx_hash.is_empty() {
        return Err(AppError::InvalidInput(
            "transfer event has no transaction hash".to_string(),
        ));
    }

    if repo
        .find_confirmed_transaction(&event.tx_hash)
        .await?
        .is_some()
    {
        debug!("⏭️ Transfer {} already reconciled", event.tx_hash);
        return Ok(ReconcileOutcome::AlreadyProcessed);
    }

    let memo_kind = Memo::from_hex(&event.memo)
        .map(|m| m.decode())
        .unwrap_or(MemoKind::Unknown);

    let order_prefix = match &memo_kind {
        MemoKind::Order { order_prefix } => order_prefix.clone(),
        other => {
            debug!(
                "⏭️ Transfer {} memo {:?} is not an order settlement",
                event.tx_hash, other
            );
            return Ok(ReconcileOutcome::Unmatched {
                memo_kind: memo_kind.clone(),
            });
        }
    };

    // The memo stores only an 8-char id prefix; with enough concurrent
    // orders this can collide and the first match wins.
    let order = match repo.find_order_by_prefix(&order_prefix).await? {
        Some(order) => order,
        None => {
            debug!(
                "⏭️ Transfer {} matched no order for prefix {}",
                event.tx_hash, order_prefix
            );
            return Ok(ReconcileOutcome::Unmatched { memo_kind });
        }
    };

    repo.set_order_status(&order.id, OrderStatus::Settled).await?;

    if let Some(run) = repo.latest_netting_run(&order.id).await? {
        repo.confirm_unhashed_transactions(run.id, &event.tx_hash)
            .await?;
        repo.set_netting_run_status(run.id, NettingRunStatus::Completed)
            .await?;
    }

    info!(
        "✓ Reconciled order {} from transfer {} (block {})",
        order.id, event.tx_hash, event.block_number
    );

    Ok(ReconcileOutcome::Reconciled { order_id: order.id })
}
