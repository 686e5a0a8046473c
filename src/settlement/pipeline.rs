use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::memo::Memo;
use crate::settlement::executor::{ExecutionResult, SettlementExecutor};
use crate::split::{compute_splits, SplitResult, SplitRule};
use crate::store::{
    NettingRun, NettingRunStatus, OrderStatus, SettlementRepository, TransactionRecord,
    TransactionStatus,
};

/// Receipt for a pipeline-driven settlement attempt.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementReceipt {
    pub order_id: String,
    pub run_id: Uuid,
    pub result: ExecutionResult,
}

/// Outcome of retrying a netting run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NettingRetryOutcome {
    /// The run already completed; retry is a no-op.
    AlreadyCompleted { run_id: Uuid },
    /// Nothing is marked failed, so there is nothing to resubmit.
    NothingToRetry { run_id: Uuid },
    Retried {
        run_id: Uuid,
        retried_count: usize,
        tx_hash: Option<String>,
    },
    RetryFailed {
        run_id: Uuid,
        error: String,
    },
}

/// Drives the order / netting-run / transaction state machines around the
/// executor: one settlement attempt per call, with every status transition
/// persisted through the repository.
pub struct SettlementPipeline {
    repo: Arc<dyn SettlementRepository>,
    executor: SettlementExecutor,
}

impl SettlementPipeline {
    pub fn new(repo: Arc<dyn SettlementRepository>, executor: SettlementExecutor) -> Self {
        Self { repo, executor }
    }

    /// Settle a pending order. Creates an executing netting run with the
    /// split parameters snapshotted, executes it, and records the outcome.
    pub async fn settle_order(
        &self,
        order_id: &str,
        total_amount: u128,
        rules: &[SplitRule],
        token: &str,
    ) -> AppResult<SettlementReceipt> {
        let order = self
            .repo
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))?;

        if !order.can_settle() {
            return Err(AppError::InvalidInput(format!(
                "order {} already {}",
                order_id,
                order.status.as_str()
            )));
        }

        self.repo
            .set_order_status(order_id, OrderStatus::Processing)
            .await?;

        let run = NettingRun::new(order_id, token, total_amount, rules.to_vec());
        self.repo.insert_netting_run(&run).await?;

        let result = match self.executor.execute(order_id, total_amount, rules, token).await {
            Ok(result) => result,
            Err(err) => {
                // Configuration error: nothing was submitted, fail the run
                // and put the order in a state the caller can correct from.
                self.repo
                    .set_netting_run_status(run.id, NettingRunStatus::Failed)
                    .await?;
                self.repo
                    .set_order_status(order_id, OrderStatus::Failed)
                    .await?;
                return Err(err);
            }
        };

        self.record_attempt(&run, &result, token).await?;
        Ok(SettlementReceipt {
            order_id: order_id.to_string(),
            run_id: run.id,
            result,
        })
    }

    /// Retry a run that has failed transfers, resubmitting only the failed
    /// subset with the run's original split parameters. A completed run
    /// rejects retry as a no-op.
    pub async fn retry_run(&self, run_id: Uuid) -> AppResult<NettingRetryOutcome> {
        let run = self
            .repo
            .netting_run(run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("netting run {}", run_id)))?;

        if run.is_completed() {
            return Ok(NettingRetryOutcome::AlreadyCompleted { run_id });
        }

        let transactions = self.repo.run_transactions(run_id).await?;
        let failed: Vec<&TransactionRecord> = transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Failed)
            .collect();

        if failed.is_empty() {
            return Ok(NettingRetryOutcome::NothingToRetry { run_id });
        }

        info!(
            "🔄 Retrying netting run {} ({} failed transfer(s))",
            run_id,
            failed.len()
        );

        self.repo
            .set_netting_run_status(run_id, NettingRunStatus::Executing)
            .await?;

        // The snapshot recomputes byte-identically, so matching on
        // (recipient, amount) recovers exactly the failed legs.
        let splits = compute_splits(run.total_amount, &run.rules)?;
        let subset: Vec<SplitResult> = splits
            .into_iter()
            .filter(|s| {
                failed
                    .iter()
                    .any(|t| t.to_address == s.to && t.amount == s.amount)
            })
            .collect();

        let result = self
            .executor
            .execute_splits(&run.order_id, subset, &run.token)
            .await;

        if result.success {
            for (tx, submitted) in failed.iter().zip(result.submitted.iter()) {
                self.repo
                    .set_transaction_status(
                        tx.id,
                        Some(submitted.tx_hash.clone()),
                        TransactionStatus::Confirmed,
                    )
                    .await?;
            }
            self.repo
                .set_netting_run_status(run_id, NettingRunStatus::Completed)
                .await?;
            self.repo
                .set_order_status(&run.order_id, OrderStatus::Settled)
                .await?;

            info!("✓ Netting run {} recovered on retry", run_id);
            Ok(NettingRetryOutcome::Retried {
                run_id,
                retried_count: failed.len(),
                tx_hash: result.tx_hash,
            })
        } else {
            self.repo
                .set_netting_run_status(run_id, NettingRunStatus::Failed)
                .await?;
            let error = result
                .error
                .unwrap_or_else(|| "settlement execution failed".to_string());
            error!("❌ Netting run {} retry failed: {}", run_id, error);
            Ok(NettingRetryOutcome::RetryFailed { run_id, error })
        }
    }

    /// Persist per-split transaction records and final statuses for one
    /// execution attempt.
    async fn record_attempt(
        &self,
        run: &NettingRun,
        result: &ExecutionResult,
        token: &str,
    ) -> AppResult<()> {
        let memo_hex = Memo::for_order(&run.order_id).to_hex();

        for (i, split) in result.splits.iter().enumerate() {
            let record = TransactionRecord::new(run.id, &split.to, split.amount, token, &memo_hex);
            // `submitted` is a prefix of the splits in order, so index
            // lookup pairs each split with the hash it landed under.
            let record = match result.submitted.get(i) {
                Some(submitted) => record.mark_confirmed(&submitted.tx_hash),
                None => record.mark_failed(),
            };
            self.repo.insert_transaction(&record).await?;
        }

        if result.success {
            self.repo
                .set_netting_run_status(run.id, NettingRunStatus::Completed)
                .await?;
            self.repo
                .set_order_status(&run.order_id, OrderStatus::Settled)
                .await?;
            info!(
                "✓ Order {} settled (run {}, tx {:?})",
                run.order_id, run.id, result.tx_hash
            );
        } else {
            self.repo
                .set_netting_run_status(run.id, NettingRunStatus::Failed)
                .await?;
            self.repo
                .set_order_status(&run.order_id, OrderStatus::Failed)
                .await?;
            error!(
                "❌ Order {} settlement failed after {}/{} transfers: {:?}",
                run.order_id,
                result.submitted.len(),
                result.splits.len(),
                result.error
            );
        }

        Ok(())
    }
}
