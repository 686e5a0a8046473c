// Ledger capability boundary.
//
// The RPC/signing client is an external collaborator: submit a transfer,
// get a hash or an error. Everything the pipeline knows about the chain
// goes through the `LedgerClient` trait.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::memo::Memo;

/// The signing identity a submission is made as.
///
/// Callers hold exactly one of these per wallet and pass it into every
/// executor explicitly; there is no process-global sender. Concurrent
/// submissions from the same identity are serialized by the ledger's own
/// per-identity sequence numbers, which is why bulk payouts cap lane size
/// instead of taking locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub address: String,
}

impl SenderIdentity {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }
}

/// One transfer to submit: recipient, amount in smallest units, the token
/// contract, and an optional correlation memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferInstruction {
    pub to: String,
    pub amount: u128,
    pub token: String,
    pub memo: Option<Memo>,
}

/// An observed on-chain transfer, as delivered by the event subscription.
/// Ephemeral: exists only while being reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: String,
    pub to: String,
    pub value: u128,
    /// Hex-encoded 32-byte memo field
    pub memo: String,
    pub tx_hash: String,
    pub block_number: u64,
}

/// External transfer-submission capability.
///
/// Implementations are reliable-but-slow and may fail independently per
/// call. No timeouts are imposed here; a hung submission hangs the lane
/// that issued it and transport-level timeouts are the implementation's
/// concern.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a single transfer. Returns the transaction hash.
    async fn submit_transfer(
        &self,
        sender: &SenderIdentity,
        instruction: &TransferInstruction,
    ) -> AppResult<String>;

    /// Submit a batch of transfers as one atomic multi-call: either every
    /// transfer lands under the returned hash or none do.
    async fn submit_batch(
        &self,
        sender: &SenderIdentity,
        instructions: &[TransferInstruction],
    ) -> AppResult<String>;

    /// Subscribe to transfer events for a token. The transport feeds the
    /// returned channel until the receiver is dropped; redelivery is
    /// possible and the consumer must be idempotent. Restarting a dropped
    /// subscription is the caller's responsibility.
    async fn subscribe_transfers(&self, token: &str) -> AppResult<mpsc::Receiver<TransferEvent>>;
}

/// Check the 20-byte hex address shape (`0x` + 40 hex chars).
pub fn is_hex_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(body) => body.len() == 40 && hex::decode(body).is_ok(),
        None => false,
    }
}

/// Convert a human-denominated decimal amount into smallest token units.
/// Rejects negative amounts and amounts with more fractional digits than
/// the token carries.
pub fn to_base_units(amount: Decimal, decimals: u32) -> AppResult<u128> {
    if amount.is_sign_negative() {
        return Err(AppError::InvalidInput(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    let scale = Decimal::from(10u64.pow(decimals));
    let scaled = amount
        .checked_mul(scale)
        .ok_or_else(|| AppError::InvalidInput(format!("amount out of range: {}", amount)))?;

    if !scaled.fract().is_zero() {
        return Err(AppError::InvalidInput(format!(
            "amount {} has more than {} decimal places",
            amount, decimals
        )));
    }

    scaled
        .to_u128()
        .ok_or_else(|| AppError::InvalidInput(format!("amount out of range: {}", amount)))
}
