use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::ledger::{LedgerClient, TransferEvent};
use crate::reconcile::reconcile_event;
use crate::store::SettlementRepository;

/// Handle to a running watcher. `stop` cancels cleanly and waits for the
/// loop to exit; dropping the handle also ends the loop, without the wait.
pub struct WatcherHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching. Future events are suppressed; an event already being
    /// processed runs to completion first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// Long-lived consumer of transfer events.
///
/// The subscription transport feeds a channel; this loop drains it one
/// event at a time and reconciles each. An error on one event is logged
/// and the loop continues - the catch-and-continue guarantee is the loop
/// structure, not a per-callsite try block. If the transport drops the
/// channel the watcher exits; resubscribing is the caller's job.
pub struct ReconciliationWatcher {
    repo: Arc<dyn SettlementRepository>,
}

impl ReconciliationWatcher {
    pub fn new(repo: Arc<dyn SettlementRepository>) -> Self {
        Self { repo }
    }

    /// Subscribe to a token's transfers and start the processing loop.
    pub async fn watch(
        &self,
        client: &dyn LedgerClient,
        token: &str,
    ) -> AppResult<WatcherHandle> {
        let events = client.subscribe_transfers(token).await?;
        Ok(self.start(events))
    }

    /// Start the processing loop over an already-established event channel.
    pub fn start(&self, mut events: mpsc::Receiver<TransferEvent>) -> WatcherHandle {
        let repo = self.repo.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("🔄 Reconciliation watcher started");

            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => {
                        info!("✓ Reconciliation watcher stopped");
                        break;
                    }

                    maybe_event = events.recv() => {
                        match maybe_event {
                            Some(event) => match reconcile_event(repo.as_ref(), &event).await {
                                Ok(outcome) => {
                                    debug!("Processed transfer {}: {:?}", event.tx_hash, outcome)
                                }
                                Err(err) => {
                                    error!(
                                        "❌ Error processing transfer {}: {}",
                                        event.tx_hash, err
                                    )
                                }
                            },
                            None => {
                                warn!("⚠️ Transfer subscription closed, watcher exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });

        WatcherHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}
