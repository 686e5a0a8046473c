// Split computation - converts percentage rules plus a total amount into
// exact integer transfer amounts in the token's smallest unit.
//
// Rounding policy: every rule except the last is floored using integer
// basis-point math; the last rule is the designated dust sink and receives
// the exact remainder. This assigns all rounding dust to one recipient
// deterministically instead of spreading it.

use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Tolerance on the percentage sum, in percent.
const PERCENT_SUM_TOLERANCE: f64 = 0.01;

/// A per-recipient percentage share of a settlement amount. Immutable once
/// attached to a product or order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRule {
    pub address: String,
    /// 0-100, fractional allowed
    pub percent: f64,
    /// e.g. "Merchant", "Platform Fee", "Creator"
    pub label: String,
}

/// One computed transfer leg of a split. Derived, never persisted apart
/// from the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub to: String,
    /// Smallest token unit
    pub amount: u128,
    pub label: String,
    pub percent: f64,
}

/// Compute exact split amounts from rules.
///
/// Guarantees `sum(amount) == total` exactly for every accepted rule set.
/// Percentages are scaled to basis points before any arithmetic so no
/// floating-point error reaches the amounts.
pub fn compute_splits(total: u128, rules: &[SplitRule]) -> Result<Vec<SplitResult>, SplitError> {
    if rules.is_empty() {
        return Err(SplitError::EmptyRules);
    }

    let total_percent: f64 = rules.iter().map(|r| r.percent).sum();
    if (total_percent - 100.0).abs() > PERCENT_SUM_TOLERANCE {
        return Err(SplitError::InvalidConfiguration { total_percent });
    }
    if rules.iter().any(|r| r.percent < 0.0 || r.percent > 100.0) {
        return Err(SplitError::InvalidConfiguration { total_percent });
    }

    let mut results = Vec::with_capacity(rules.len());
    let mut allocated: u128 = 0;

    for (i, rule) in rules.iter().enumerate() {
        let amount = if i == rules.len() - 1 {
            // Dust sink: the last recipient takes the exact remainder.
            // The 0.01 tolerance can floor-allocate past the total when the
            // sum leans above 100; that is a configuration problem, not a
            // rounding one.
            total
                .checked_sub(allocated)
                .ok_or(SplitError::InvalidConfiguration { total_percent })?
        } else {
            let basis_points = (rule.percent * 100.0).round() as u128;
            let amount = total * basis_points / 10_000;
            allocated += amount;
            amount
        };

        results.push(SplitResult {
            to: rule.address.clone(),
            amount,
            label: rule.label.clone(),
            percent: rule.percent,
        });
    }

    Ok(results)
}
