// Persistence boundary for settlement state.
//
// Orders, netting runs and transactions are owned by an external store;
// this crate drives their state machines through the repository trait and
// ships an in-memory implementation for tests and embeddings without a
// database.

pub mod memory;
pub mod models;
pub mod repository;

pub use memory::InMemoryRepository;
pub use models::{
    NettingRun, NettingRunStatus, Order, OrderStatus, TransactionRecord, TransactionStatus,
};
pub use repository::SettlementRepository;
