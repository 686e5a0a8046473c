//! Settlement and reconciliation pipeline for memo-tagged stablecoin
//! transfers.
//!
//! The pipeline turns a payment obligation (an order or a bulk payout run)
//! into exact on-chain transfer instructions, executes them atomically with
//! a sequential fallback, tags every transfer with a fixed-width memo, and
//! reconciles asynchronous confirmations back into settlement state exactly
//! once. The ledger client, persistence engine and narrative generator are
//! external collaborators behind traits.

pub mod config;
pub mod error;
pub mod ledger;
pub mod memo;
pub mod payout;
pub mod reconcile;
pub mod settlement;
pub mod split;
pub mod store;
pub mod subscription;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use ledger::{LedgerClient, SenderIdentity, TransferEvent, TransferInstruction};
pub use memo::{Memo, MemoKind};
pub use payout::{PayoutExecutor, PayoutRecipient, PayoutRunSummary};
pub use reconcile::{reconcile_event, ReconcileOutcome, ReconciliationWatcher};
pub use settlement::{ExecutionResult, SettlementExecutor, SettlementPipeline};
pub use split::{compute_splits, SplitResult, SplitRule};
pub use store::{InMemoryRepository, SettlementRepository};
pub use subscription::{RetryResult, Subscription, SubscriptionRetrier};
