// Subscription payment recovery - bounded retries over a fixed backoff
// table. The controller decides and reports; it never sleeps. A scheduler
// collaborator invokes `retry` again no earlier than `next_retry_at`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::ledger::{to_base_units, LedgerClient, SenderIdentity, TransferInstruction};
use crate::memo::Memo;

/// Backoff schedule in minutes, indexed by attempt number and clamped to
/// the last entry: 1m, 5m, 30m, 2h, 24h.
pub const BACKOFF_SCHEDULE_MINUTES: [i64; 5] = [1, 5, 30, 120, 1440];

pub fn backoff_minutes(attempt_number: u32) -> i64 {
    let idx = (attempt_number as usize).min(BACKOFF_SCHEDULE_MINUTES.len() - 1);
    BACKOFF_SCHEDULE_MINUTES[idx]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Weekly,
    Monthly,
    Yearly,
}

/// A recurring payment with retry bookkeeping. `retry_count` strictly
/// increases per attempt; past `max_retries` the subscription is terminal
/// and is never retried automatically again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub merchant_wallet: String,
    pub customer_wallet: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub interval: BillingInterval,
    pub status: SubscriptionStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_payment_at: DateTime<Utc>,
    pub last_failed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAction {
    PaymentSucceeded,
    RetryScheduled,
    MaxRetriesReached,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryResult {
    pub success: bool,
    pub subscription_id: String,
    pub attempt_number: u32,
    pub action: RetryAction,
    pub tx_hash: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub message: String,
}

/// Retries failed subscription charges against the customer's wallet, then
/// an optional backup, with bounded attempts.
pub struct SubscriptionRetrier {
    client: Arc<dyn LedgerClient>,
    token: String,
    token_decimals: u32,
}

impl SubscriptionRetrier {
    pub fn new(client: Arc<dyn LedgerClient>, token: &str, token_decimals: u32) -> Self {
        Self {
            client,
            token: token.to_string(),
            token_decimals,
        }
    }

    /// Attempt to recover one failed subscription payment.
    ///
    /// Past the retry budget this returns `MaxRetriesReached` without
    /// touching the ledger; that outcome is terminal and escalates to a
    /// human, it is not a retryable error.
    pub async fn retry(
        &self,
        subscription: &Subscription,
        backup: Option<&SenderIdentity>,
    ) -> AppResult<RetryResult> {
        let attempt_number = subscription.retry_count + 1;

        if attempt_number > subscription.max_retries {
            return Ok(RetryResult {
                success: false,
                subscription_id: subscription.id.clone(),
                attempt_number,
                action: RetryAction::MaxRetriesReached,
                tx_hash: None,
                next_retry_at: None,
                message: format!(
                    "Maximum retry attempts ({}) exceeded. Subscription marked for manual review.",
                    subscription.max_retries
                ),
            });
        }

        let amount = to_base_units(subscription.amount, self.token_decimals)?;
        let instruction = TransferInstruction {
            to: subscription.merchant_wallet.clone(),
            amount,
            token: self.token.clone(),
            memo: Some(Memo::for_subscription(&subscription.id)),
        };

        // Primary wallet first, then the backup if it is actually distinct.
        let primary = SenderIdentity::new(&subscription.customer_wallet);
        let mut identities = vec![primary.clone()];
        if let Some(backup) = backup {
            if backup.address != primary.address {
                identities.push(backup.clone());
            }
        }

        for identity in &identities {
            match self.client.submit_transfer(identity, &instruction).await {
                Ok(tx_hash) => {
                    let wallet_prefix: String = identity.address.chars().take(8).collect();
                    info!(
                        "✓ Subscription {} recovered on attempt {} via wallet {}...",
                        subscription.id, attempt_number, wallet_prefix
                    );
                    return Ok(RetryResult {
                        success: true,
                        subscription_id: subscription.id.clone(),
                        attempt_number,
                        action: RetryAction::PaymentSucceeded,
                        tx_hash: Some(tx_hash),
                        next_retry_at: None,
                        message: format!(
                            "Payment recovered on attempt {} via wallet {}...",
                            attempt_number, wallet_prefix
                        ),
                    });
                }
                Err(err) => {
                    debug!(
                        "Subscription {} charge via {} failed: {}",
                        subscription.id, identity.address, err
                    );
                }
            }
        }

        let minutes = backoff_minutes(attempt_number);
        let next_retry_at = Utc::now() + Duration::minutes(minutes);
        warn!(
            "⚠️ Subscription {} payment failed on attempt {}, next retry in {} minute(s)",
            subscription.id, attempt_number, minutes
        );

        Ok(RetryResult {
            success: false,
            subscription_id: subscription.id.clone(),
            attempt_number,
            action: RetryAction::RetryScheduled,
            tx_hash: None,
            next_retry_at: Some(next_retry_at),
            message: format!(
                "Payment failed on attempt {}. Next retry in {} minutes.",
                attempt_number, minutes
            ),
        })
    }
}
