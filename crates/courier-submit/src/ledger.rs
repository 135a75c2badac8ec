/*!
# Ledger Interface

The engine never talks to an RPC client directly. Everything it needs from the
network goes through [`Ledger`], which is injected as an `Arc<dyn Ledger>` and
shared read-only across attempts. [`crate::RpcLedger`] is the production
implementation; tests script their own.
*/

use crate::LedgerResult;
use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// A blockhash together with the last block height at which it is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyMarker {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Terminal status of a processed signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Succeeded,
    Failed(String),
}

/// Result of a dry-run simulation
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    /// Error reported by the runtime, if the transaction would fail
    pub err: Option<String>,
    /// Compute units consumed
    pub units_consumed: Option<u64>,
    /// Program logs
    pub logs: Vec<String>,
}

/// Options passed through to the send call
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: CommitmentConfig,
}

/// A one-shot signature notification registration
///
/// Dropping the subscription cancels its token, which tells the
/// implementation to unregister the listener.
#[derive(Debug)]
pub struct SignatureSubscription {
    notification: oneshot::Receiver<SignatureState>,
    cancel: CancellationToken,
}

impl SignatureSubscription {
    pub fn new(notification: oneshot::Receiver<SignatureState>, cancel: CancellationToken) -> Self {
        Self {
            notification,
            cancel,
        }
    }

    /// Wait for the notification. `None` means the listener went away without
    /// delivering one.
    pub async fn recv(&mut self) -> Option<SignatureState> {
        (&mut self.notification).await.ok()
    }
}

impl Drop for SignatureSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch a fresh blockhash and its validity horizon
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> LedgerResult<RecencyMarker>;

    /// Dry-run a signed transaction
    async fn simulate(
        &self,
        transaction: &Transaction,
        commitment: CommitmentConfig,
    ) -> LedgerResult<SimulationReport>;

    /// Send a signed transaction once
    async fn send(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> LedgerResult<Signature>;

    /// Status of a signature at the given commitment, `None` if not yet seen
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<Option<SignatureState>>;

    /// Register for a single notification when the signature reaches the commitment
    async fn subscribe_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<SignatureSubscription>;

    async fn get_balance(&self, pubkey: &Pubkey) -> LedgerResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_notification() {
        let (sender, receiver) = oneshot::channel();
        let mut subscription = SignatureSubscription::new(receiver, CancellationToken::new());

        sender.send(SignatureState::Succeeded).unwrap();
        assert_eq!(subscription.recv().await, Some(SignatureState::Succeeded));
    }

    #[tokio::test]
    async fn test_subscription_reports_closed_listener() {
        let (sender, receiver) = oneshot::channel::<SignatureState>();
        let mut subscription = SignatureSubscription::new(receiver, CancellationToken::new());

        drop(sender);
        assert_eq!(subscription.recv().await, None);
    }

    #[test]
    fn test_dropping_subscription_cancels_token() {
        let (_sender, receiver) = oneshot::channel::<SignatureState>();
        let cancel = CancellationToken::new();
        let subscription = SignatureSubscription::new(receiver, cancel.clone());

        assert!(!cancel.is_cancelled());
        drop(subscription);
        assert!(cancel.is_cancelled());
    }
}
