// Atomic settlement execution.
//
// Settlement flow:
// 1. Compute exact split amounts from the order's rules
// 2. Build one memo-tagged transfer per split
// 3. Prefer a single atomic multi-transfer call
// 4. Fall back to sequential transfers when the batch is rejected
// 5. Surface partial failures to the caller's retry layer, never retry here

pub mod executor;
pub mod pipeline;

pub use executor::{ExecutionPath, ExecutionResult, SettlementExecutor, SubmittedTransfer};
pub use pipeline::{NettingRetryOutcome, SettlementPipeline, SettlementReceipt};
