#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use settleflow::error::{AppResult, SubmissionError};
use settleflow::ledger::{LedgerClient, SenderIdentity, TransferEvent, TransferInstruction};

static TRACING: std::sync::Once = std::sync::Once::new();

/// Install a test subscriber once so `RUST_LOG=debug cargo test` shows the
/// pipeline's tracing output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
struct State {
    reject_batches: bool,
    failing_recipients: Vec<String>,
    failing_senders: Vec<String>,
    batch_calls: u32,
    transfer_calls: u32,
    submitted: Vec<Submission>,
    hash_counter: u64,
    event_sender: Option<mpsc::Sender<TransferEvent>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub sender: String,
    pub to: String,
    pub amount: u128,
}

/// Programmable in-memory ledger: transfers succeed with synthetic hashes
/// unless the test marks a recipient, sender, or the batch path as failing.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<State>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `submit_batch` call is rejected, forcing the sequential path.
    pub fn reject_batches(self) -> Self {
        self.state.lock().reject_batches = true;
        self
    }

    /// Individual transfers to this recipient fail.
    pub fn fail_transfers_to(self, address: &str) -> Self {
        self.state.lock().failing_recipients.push(address.to_string());
        self
    }

    /// Submissions signed as this sender fail.
    pub fn fail_sender(self, address: &str) -> Self {
        self.state.lock().failing_senders.push(address.to_string());
        self
    }

    /// Clear every programmed failure, e.g. after funding is restored.
    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.reject_batches = false;
        state.failing_recipients.clear();
        state.failing_senders.clear();
    }

    pub fn batch_calls(&self) -> u32 {
        self.state.lock().batch_calls
    }

    pub fn transfer_calls(&self) -> u32 {
        self.state.lock().transfer_calls
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submitted.clone()
    }

    /// Feed for the most recent subscription, for pushing synthetic events.
    pub fn event_sender(&self) -> Option<mpsc::Sender<TransferEvent>> {
        self.state.lock().event_sender.clone()
    }
}

fn next_hash(state: &mut State) -> String {
    state.hash_counter += 1;
    format!("0x{:064x}", state.hash_counter)
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn submit_transfer(
        &self,
        sender: &SenderIdentity,
        instruction: &TransferInstruction,
    ) -> AppResult<String> {
        let mut state = self.state.lock();
        state.transfer_calls += 1;

        if state.failing_senders.contains(&sender.address) {
            return Err(SubmissionError::TransferRejected {
                to: instruction.to.clone(),
                message: format!("sender {} rejected", sender.address),
            }
            .into());
        }
        if state.failing_recipients.contains(&instruction.to) {
            return Err(SubmissionError::TransferRejected {
                to: instruction.to.clone(),
                message: "insufficient funds".to_string(),
            }
            .into());
        }

        state.submitted.push(Submission {
            sender: sender.address.clone(),
            to: instruction.to.clone(),
            amount: instruction.amount,
        });
        Ok(next_hash(&mut state))
    }

    async fn submit_batch(
        &self,
        sender: &SenderIdentity,
        instructions: &[TransferInstruction],
    ) -> AppResult<String> {
        let mut state = self.state.lock();
        state.batch_calls += 1;

        if state.reject_batches || state.failing_senders.contains(&sender.address) {
            return Err(SubmissionError::BatchRejected(
                "atomic batch unsupported".to_string(),
            )
            .into());
        }

        for instruction in instructions {
            state.submitted.push(Submission {
                sender: sender.address.clone(),
                to: instruction.to.clone(),
                amount: instruction.amount,
            });
        }
        Ok(next_hash(&mut state))
    }

    async fn subscribe_transfers(&self, _token: &str) -> AppResult<mpsc::Receiver<TransferEvent>> {
        let (tx, rx) = mpsc::channel(32);
        self.state.lock().event_sender = Some(tx);
        Ok(rx)
    }
}

pub fn sponsor() -> SenderIdentity {
    SenderIdentity::new("0xfee0000000000000000000000000000000000001")
}

pub const TOKEN: &str = "0x20c0000000000000000000000000000000000001";

pub fn addr(n: u64) -> String {
    format!("0x{:040x}", n)
}
