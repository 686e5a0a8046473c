// Bulk payouts over parallel nonce lanes.
//
// Payout flow:
// 1. Ingest and dedupe the recipient list
// 2. Validate the whole run before anything is submitted
// 3. Partition into fixed-size lanes, one sequence space each
// 4. Run lanes concurrently, each lane strictly sequential inside
// 5. Aggregate per-recipient outcomes into a run summary

pub mod executor;
pub mod lanes;
pub mod recipients;

pub use executor::{
    NarrativeGenerator, PayoutExecutor, PayoutResult, PayoutRunSummary, PayoutStatus,
};
pub use lanes::{partition_into_lanes, LANE_SIZE};
pub use recipients::{parse_recipient_csv, validate_payout_run, PayoutRecipient, PayoutValidation};
