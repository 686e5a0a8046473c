use crate::payout::recipients::PayoutRecipient;

/// Recipients per nonce lane.
///
/// Transfers from one sender share a sequence number, so a lane is executed
/// strictly in order. The cap bounds how many unconfirmed transfers sit on
/// one sequence space at a time; lanes get disjoint spaces and can run
/// concurrently without the ledger rejecting out-of-order submissions.
pub const LANE_SIZE: usize = 50;

/// Partition recipients into nonce-lane groups, preserving input order
/// within each lane. A list of N recipients yields ceil(N / LANE_SIZE)
/// lanes.
pub fn partition_into_lanes(recipients: &[PayoutRecipient]) -> Vec<Vec<PayoutRecipient>> {
    recipients
        .chunks(LANE_SIZE)
        .map(|lane| lane.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients(n: usize) -> Vec<PayoutRecipient> {
        (0..n)
            .map(|i| PayoutRecipient {
                address: format!("0x{:040x}", i),
                amount: "1".to_string(),
                memo: None,
                label: None,
            })
            .collect()
    }

    #[test]
    fn test_partition_sizes() {
        let lanes = partition_into_lanes(&recipients(120));
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes[0].len(), 50);
        assert_eq!(lanes[1].len(), 50);
        assert_eq!(lanes[2].len(), 20);
    }

    #[test]
    fn test_partition_exact_multiple() {
        let lanes = partition_into_lanes(&recipients(100));
        assert_eq!(lanes.len(), 2);
        assert!(lanes.iter().all(|l| l.len() == 50));
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_into_lanes(&recipients(0)).is_empty());
    }

    #[test]
    fn test_partition_preserves_order() {
        let input = recipients(75);
        let lanes = partition_into_lanes(&input);
        let flattened: Vec<PayoutRecipient> = lanes.into_iter().flatten().collect();
        assert_eq!(flattened, input);
    }
}
