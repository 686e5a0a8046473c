use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::{AppResult, PayoutError};
use crate::ledger::is_hex_address;

/// One row of a bulk payout run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRecipient {
    pub address: String,
    /// Human-readable decimal, e.g. "10.50"
    pub amount: String,
    pub memo: Option<String>,
    /// e.g. employee name or vendor
    pub label: Option<String>,
}

/// Validation report for a payout run. A value, not an exception: callers
/// decide what to do with an invalid run.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub recipient_count: usize,
}

/// Parse an uploaded recipient list into payout rows.
///
/// Expected columns: address (or wallet), amount, optional memo, optional
/// label (or name). Rows are deduplicated by (address, amount) so a
/// double-pasted row cannot pay twice.
pub fn parse_recipient_csv(content: &str) -> AppResult<Vec<PayoutRecipient>> {
    let lines: Vec<&str> = content.trim().lines().collect();
    if lines.len() < 2 {
        return Err(PayoutError::MissingRows.into());
    }

    let header: Vec<String> = lines[0]
        .to_lowercase()
        .split(',')
        .map(|h| h.trim().to_string())
        .collect();
    let address_idx = header
        .iter()
        .position(|h| h == "address" || h == "wallet")
        .ok_or(PayoutError::MissingAddressColumn)?;
    let amount_idx = header
        .iter()
        .position(|h| h == "amount")
        .ok_or(PayoutError::MissingAmountColumn)?;
    let memo_idx = header.iter().position(|h| h == "memo");
    let label_idx = header.iter().position(|h| h == "label" || h == "name");

    let mut recipients = Vec::new();
    let mut seen = HashSet::new();

    for (i, line) in lines.iter().enumerate().skip(1) {
        let cols: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
        let address = cols.get(address_idx).copied().unwrap_or_default();
        let amount = cols.get(amount_idx).copied().unwrap_or_default();
        if address.is_empty() || amount.is_empty() {
            continue;
        }

        if !is_hex_address(address) {
            return Err(PayoutError::InvalidAddress {
                line: i + 1,
                address: address.to_string(),
            }
            .into());
        }

        let parsed = Decimal::from_str(amount).ok().filter(|a| *a > Decimal::ZERO);
        if parsed.is_none() {
            return Err(PayoutError::InvalidAmount {
                line: i + 1,
                amount: amount.to_string(),
            }
            .into());
        }

        let key = format!("{}-{}", address.to_lowercase(), amount);
        if !seen.insert(key) {
            continue;
        }

        recipients.push(PayoutRecipient {
            address: address.to_string(),
            amount: amount.to_string(),
            memo: memo_idx
                .and_then(|idx| cols.get(idx))
                .filter(|m| !m.is_empty())
                .map(|m| m.to_string()),
            label: label_idx
                .and_then(|idx| cols.get(idx))
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string()),
        });
    }

    Ok(recipients)
}

/// Validate an entire payout run. A run with any invalid row must be
/// rejected wholesale before any submission, so the report carries every
/// problem at once.
pub fn validate_payout_run(recipients: &[PayoutRecipient]) -> PayoutValidation {
    let mut errors = Vec::new();
    let mut total_amount = Decimal::ZERO;

    for (i, recipient) in recipients.iter().enumerate() {
        if !is_hex_address(&recipient.address) {
            errors.push(format!("Row {}: invalid address {}", i + 1, recipient.address));
        }

        match Decimal::from_str(&recipient.amount) {
            Ok(amount) if amount > Decimal::ZERO => total_amount += amount,
            _ => errors.push(format!("Row {}: invalid amount {}", i + 1, recipient.amount)),
        }
    }

    PayoutValidation {
        valid: errors.is_empty(),
        errors,
        total_amount,
        recipient_count: recipients.len(),
    }
}
