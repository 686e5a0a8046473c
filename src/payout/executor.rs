use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppResult, PayoutError};
use crate::ledger::{to_base_units, LedgerClient, SenderIdentity, TransferInstruction};
use crate::payout::lanes::partition_into_lanes;
use crate::payout::recipients::{validate_payout_run, PayoutRecipient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Success,
    Failed,
    Pending,
}

/// Outcome for one recipient in one run. Immutable once status leaves
/// pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutResult {
    pub recipient: String,
    pub amount: String,
    pub status: PayoutStatus,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub lane_index: usize,
}

/// Aggregate over all lanes of a bulk run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRunSummary {
    pub run_id: String,
    pub total_recipients: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub completed_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    pub lane_count: usize,
    pub results: Vec<PayoutResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub narrative: Option<String>,
}

/// Optional prose generator for run summaries. Strictly decorative: its
/// absence or failure never blocks a payout.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn narrate(&self, summary: &str) -> AppResult<String>;
}

/// Executes bulk payout runs across concurrent nonce lanes.
pub struct PayoutExecutor {
    client: Arc<dyn LedgerClient>,
    sponsor: SenderIdentity,
    token: String,
    token_decimals: u32,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
}

impl PayoutExecutor {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        sponsor: SenderIdentity,
        token: &str,
        token_decimals: u32,
    ) -> Self {
        Self {
            client,
            sponsor,
            token: token.to_string(),
            token_decimals,
            narrator: None,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Execute a full payout run.
    ///
    /// The run is validated wholesale first: any invalid row rejects the
    /// whole list before a single transfer is submitted. Lanes then run
    /// concurrently; a failed recipient is recorded and its lane continues.
    /// Failed entries stay failed for an operator-triggered rerun; nothing
    /// retries automatically here.
    pub async fn execute(
        &self,
        run_id: &str,
        recipients: &[PayoutRecipient],
    ) -> AppResult<PayoutRunSummary> {
        if recipients.is_empty() {
            return Err(PayoutError::EmptyRun.into());
        }

        let validation = validate_payout_run(recipients);
        if !validation.valid {
            return Err(PayoutError::ValidationFailed {
                errors: validation.errors,
            }
            .into());
        }

        let started_at = Utc::now();
        let lanes = partition_into_lanes(recipients);

        info!(
            "🔄 Payout run {} starting: {} recipient(s) across {} lane(s)",
            run_id,
            recipients.len(),
            lanes.len()
        );

        let lane_results = futures::future::join_all(
            lanes
                .iter()
                .enumerate()
                .map(|(i, lane)| self.execute_lane(i, lane)),
        )
        .await;

        let results: Vec<PayoutResult> = lane_results.into_iter().flatten().collect();
        let completed_count = results
            .iter()
            .filter(|r| r.status == PayoutStatus::Success)
            .count();
        let failed_count = results
            .iter()
            .filter(|r| r.status == PayoutStatus::Failed)
            .count();
        let pending_count = results
            .iter()
            .filter(|r| r.status == PayoutStatus::Pending)
            .count();

        let mut summary = PayoutRunSummary {
            run_id: run_id.to_string(),
            total_recipients: recipients.len(),
            total_amount: validation.total_amount,
            completed_count,
            failed_count,
            pending_count,
            lane_count: lanes.len(),
            results,
            started_at,
            completed_at: Some(Utc::now()),
            narrative: None,
        };

        info!(
            "✓ Payout run {} finished: {} succeeded, {} failed",
            run_id, summary.completed_count, summary.failed_count
        );

        let narrative = self.narrate(&summary).await;
        summary.narrative = narrative;
        Ok(summary)
    }

    /// Execute a single lane sequentially. Each transfer is awaited before
    /// the next begins because the lane shares one sequence space; a failed
    /// recipient must not block the remainder of the lane.
    async fn execute_lane(
        &self,
        lane_index: usize,
        recipients: &[PayoutRecipient],
    ) -> Vec<PayoutResult> {
        let mut results = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            results.push(self.pay_recipient(lane_index, recipient).await);
        }

        results
    }

    async fn pay_recipient(&self, lane_index: usize, recipient: &PayoutRecipient) -> PayoutResult {
        let base_units = Decimal::from_str(&recipient.amount)
            .map_err(crate::error::AppError::from)
            .and_then(|amount| to_base_units(amount, self.token_decimals));

        let amount = match base_units {
            Ok(amount) => amount,
            Err(err) => {
                return PayoutResult {
                    recipient: recipient.address.clone(),
                    amount: recipient.amount.clone(),
                    status: PayoutStatus::Failed,
                    tx_hash: None,
                    error: Some(err.to_string()),
                    lane_index,
                }
            }
        };

        let instruction = TransferInstruction {
            to: recipient.address.clone(),
            amount,
            token: self.token.clone(),
            memo: None,
        };

        match self.client.submit_transfer(&self.sponsor, &instruction).await {
            Ok(tx_hash) => {
                debug!(
                    "✓ Lane {} paid {} {} (tx: {})",
                    lane_index, recipient.amount, recipient.address, tx_hash
                );
                PayoutResult {
                    recipient: recipient.address.clone(),
                    amount: recipient.amount.clone(),
                    status: PayoutStatus::Success,
                    tx_hash: Some(tx_hash),
                    error: None,
                    lane_index,
                }
            }
            Err(err) => {
                warn!(
                    "⚠️ Lane {} transfer to {} failed: {}",
                    lane_index, recipient.address, err
                );
                PayoutResult {
                    recipient: recipient.address.clone(),
                    amount: recipient.amount.clone(),
                    status: PayoutStatus::Failed,
                    tx_hash: None,
                    error: Some(err.to_string()),
                    lane_index,
                }
            }
        }
    }

    async fn narrate(&self, summary: &PayoutRunSummary) -> Option<String> {
        let narrator = self.narrator.as_ref()?;

        let briefing = format!(
            "Payout run {}: {} recipients, total {}, {} succeeded, {} failed, {} lane(s)",
            summary.run_id,
            summary.total_recipients,
            summary.total_amount,
            summary.completed_count,
            summary.failed_count,
            summary.lane_count
        );

        match narrator.narrate(&briefing).await {
            Ok(narrative) => Some(narrative),
            Err(err) => {
                warn!("⚠️ Narrative generation failed, continuing without: {}", err);
                None
            }
        }
    }
}
