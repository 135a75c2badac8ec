/*!
# Confirmation Tracker

Two detection channels race for every sent signature:

- a polling task that checks the signature status every `poll_interval`
- a subscription task that waits for a one-shot signature notification

Both write into a [`ResolutionSlot`]. The first write wins, cancels the shared
token and is the attempt's only outcome. A backup deadline bounds the race;
when it fires the tracker does one last direct status check before declaring a
timeout. Every task is aborted and joined before [`ConfirmationTracker::track`]
returns, so nothing from this attempt survives into the next one.
*/

use crate::{
    ledger::{Ledger, SignatureState},
    SubmitOptions,
};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::oneshot, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Verdict for a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed(Signature),
    OnChainFailure { signature: Signature, reason: String },
    Timeout(Signature),
}

impl ConfirmationOutcome {
    fn from_state(signature: Signature, state: SignatureState) -> Self {
        match state {
            SignatureState::Succeeded => ConfirmationOutcome::Confirmed(signature),
            SignatureState::Failed(reason) => {
                ConfirmationOutcome::OnChainFailure { signature, reason }
            }
        }
    }
}

/// Which channel produced the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionChannel {
    Polling,
    Subscription,
    Deadline,
}

impl fmt::Display for DetectionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionChannel::Polling => write!(f, "polling"),
            DetectionChannel::Subscription => write!(f, "subscription"),
            DetectionChannel::Deadline => write!(f, "deadline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: ConfirmationOutcome,
    pub channel: DetectionChannel,
}

/// Single-assignment result slot shared by the detection channels
#[derive(Debug)]
pub struct ResolutionSlot {
    sender: Mutex<Option<oneshot::Sender<Resolution>>>,
    cancel: CancellationToken,
}

impl ResolutionSlot {
    pub fn new() -> (Self, oneshot::Receiver<Resolution>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(sender)),
                cancel: CancellationToken::new(),
            },
            receiver,
        )
    }

    /// Returns `true` if this call won the slot
    pub fn resolve(&self, outcome: ConfirmationOutcome, channel: DetectionChannel) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(sender) => {
                self.cancel.cancel();
                let _ = sender.send(Resolution { outcome, channel });
                true
            }
            None => {
                debug!(%channel, "Ignoring late resolution");
                false
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

pub struct ConfirmationTracker {
    ledger: Arc<dyn Ledger>,
    commitment: CommitmentConfig,
    poll_interval: Duration,
    timeout: Duration,
}

impl ConfirmationTracker {
    pub fn new(ledger: Arc<dyn Ledger>, options: &SubmitOptions) -> Self {
        Self {
            ledger,
            commitment: options.commitment,
            poll_interval: options.poll_interval,
            timeout: options.confirmation_timeout,
        }
    }

    /// Race both detection channels against the deadline
    pub async fn track(&self, signature: Signature) -> Resolution {
        let (slot, mut receiver) = ResolutionSlot::new();
        let slot = Arc::new(slot);
        let cancel = slot.cancellation_token();

        let mut tasks = JoinSet::new();
        tasks.spawn(poll_status(
            self.ledger.clone(),
            signature,
            self.commitment,
            self.poll_interval,
            slot.clone(),
        ));
        tasks.spawn(watch_subscription(
            self.ledger.clone(),
            signature,
            self.commitment,
            slot.clone(),
        ));

        let winner = tokio::select! {
            resolved = &mut receiver => resolved.ok(),
            _ = tokio::time::sleep(self.timeout) => None,
        };

        cancel.cancel();
        tasks.shutdown().await;

        // A channel may have won between the deadline firing and shutdown
        let resolution = match winner.or_else(|| receiver.try_recv().ok()) {
            Some(resolution) => resolution,
            None => {
                let outcome = self.reconcile(signature).await;
                slot.resolve(outcome.clone(), DetectionChannel::Deadline);
                Resolution {
                    outcome,
                    channel: DetectionChannel::Deadline,
                }
            }
        };

        info!(
            %signature,
            channel = %resolution.channel,
            outcome = ?resolution.outcome,
            "Confirmation resolved"
        );
        resolution
    }

    /// Last direct status check before a timeout is declared
    async fn reconcile(&self, signature: Signature) -> ConfirmationOutcome {
        match self.ledger.signature_status(&signature, self.commitment).await {
            Ok(Some(state)) => {
                info!(%signature, "Deadline reconciliation found a status");
                ConfirmationOutcome::from_state(signature, state)
            }
            Ok(None) => ConfirmationOutcome::Timeout(signature),
            Err(err) => {
                warn!(%signature, error = %err, "Deadline reconciliation failed");
                ConfirmationOutcome::Timeout(signature)
            }
        }
    }
}

async fn poll_status(
    ledger: Arc<dyn Ledger>,
    signature: Signature,
    commitment: CommitmentConfig,
    interval: Duration,
    slot: Arc<ResolutionSlot>,
) {
    let cancel = slot.cancellation_token();
    let mut polls = 0usize;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        polls += 1;
        let status = tokio::select! {
            _ = cancel.cancelled() => return,
            status = ledger.signature_status(&signature, commitment) => status,
        };

        match status {
            Ok(Some(state)) => {
                slot.resolve(
                    ConfirmationOutcome::from_state(signature, state),
                    DetectionChannel::Polling,
                );
                return;
            }
            Ok(None) => debug!(%signature, polls, "Signature not yet at commitment"),
            Err(err) => warn!(%signature, polls, error = %err, "Signature status poll failed"),
        }
    }
}

async fn watch_subscription(
    ledger: Arc<dyn Ledger>,
    signature: Signature,
    commitment: CommitmentConfig,
    slot: Arc<ResolutionSlot>,
) {
    let cancel = slot.cancellation_token();

    let mut subscription = tokio::select! {
        _ = cancel.cancelled() => return,
        subscription = ledger.subscribe_signature(&signature, commitment) => match subscription {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(
                    %signature,
                    error = %err,
                    "Signature subscription unavailable, relying on polling"
                );
                return;
            }
        },
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        notification = subscription.recv() => match notification {
            Some(state) => {
                slot.resolve(
                    ConfirmationOutcome::from_state(signature, state),
                    DetectionChannel::Subscription,
                );
            }
            None => debug!(%signature, "Signature subscription closed without a notification"),
        },
    }
}
