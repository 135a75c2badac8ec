use crate::{
    ledger::{
        Ledger, RecencyMarker, SendOptions, SignatureState, SignatureSubscription,
        SimulationReport,
    },
    LedgerError, LedgerResult,
};
use async_trait::async_trait;
use futures::StreamExt;
use solana_client::{
    nonblocking::{pubsub_client::PubsubClient, rpc_client::RpcClient},
    rpc_config::{
        RpcSendTransactionConfig, RpcSignatureSubscribeConfig, RpcSimulateTransactionConfig,
    },
    rpc_response::RpcSignatureResult,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::sync::Arc;
use tokio::sync::{oneshot, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// [`Ledger`] backed by a JSON-RPC client and an optional websocket endpoint
///
/// Without a websocket URL, signature subscriptions fail and the confirmation
/// tracker falls back to polling alone.
pub struct RpcLedger {
    rpc_client: Arc<RpcClient>,
    ws_url: Option<String>,
    pubsub: OnceCell<Arc<PubsubClient>>,
}

impl RpcLedger {
    pub fn new(rpc_client: Arc<RpcClient>, ws_url: Option<String>) -> Self {
        Self {
            rpc_client,
            ws_url,
            pubsub: OnceCell::new(),
        }
    }

    /// Derive the websocket endpoint the way the Solana CLI does
    pub fn from_urls(rpc_url: &str, ws_url: Option<&str>) -> Self {
        let ws_url = ws_url
            .map(str::to_string)
            .or_else(|| websocket_url_for(rpc_url));
        Self::new(Arc::new(RpcClient::new(rpc_url.to_string())), ws_url)
    }

    pub fn rpc_client(&self) -> &Arc<RpcClient> {
        &self.rpc_client
    }

    async fn pubsub(&self) -> LedgerResult<Arc<PubsubClient>> {
        let ws_url = self
            .ws_url
            .as_deref()
            .ok_or_else(|| {
                LedgerError::Subscription("no websocket endpoint configured".to_string())
            })?;

        self.pubsub
            .get_or_try_init(|| async {
                debug!("Connecting to websocket endpoint {}", ws_url);
                PubsubClient::new(ws_url)
                    .await
                    .map(Arc::new)
                    .map_err(|e| LedgerError::Subscription(e.to_string()))
            })
            .await
            .cloned()
    }
}

/// `http(s)://host:8899` becomes `ws(s)://host:8900`; other ports keep their value
pub fn websocket_url_for(rpc_url: &str) -> Option<String> {
    let (scheme, rest) = if let Some(rest) = rpc_url.strip_prefix("https://") {
        ("wss://", rest)
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        ("ws://", rest)
    } else {
        return None;
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let authority = match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => format!("{}:{}", host, port.saturating_add(1)),
            Err(_) => authority.to_string(),
        },
        None => authority.to_string(),
    };

    Some(format!("{}{}{}", scheme, authority, path))
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> LedgerResult<RecencyMarker> {
        let (blockhash, last_valid_block_height) = self
            .rpc_client
            .get_latest_blockhash_with_commitment(commitment)
            .await?;
        Ok(RecencyMarker {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn simulate(
        &self,
        transaction: &Transaction,
        commitment: CommitmentConfig,
    ) -> LedgerResult<SimulationReport> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: true,
            replace_recent_blockhash: false,
            commitment: Some(commitment),
            ..Default::default()
        };

        let result = self
            .rpc_client
            .simulate_transaction_with_config(transaction, config)
            .await?;

        Ok(SimulationReport {
            err: result.value.err.as_ref().map(|e| e.to_string()),
            units_consumed: result.value.units_consumed,
            logs: result.value.logs.unwrap_or_default(),
        })
    }

    async fn send(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> LedgerResult<Signature> {
        // The coordinator owns retries, so the node must not rebroadcast on its own
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(options.preflight_commitment.commitment),
            max_retries: Some(0),
            ..Default::default()
        };

        Ok(self
            .rpc_client
            .send_transaction_with_config(transaction, config)
            .await?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<Option<SignatureState>> {
        let status = self
            .rpc_client
            .get_signature_status_with_commitment(signature, commitment)
            .await?;

        Ok(status.map(|result| match result {
            Ok(()) => SignatureState::Succeeded,
            Err(err) => SignatureState::Failed(err.to_string()),
        }))
    }

    async fn subscribe_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> LedgerResult<SignatureSubscription> {
        let pubsub = self.pubsub().await?;
        let signature = *signature;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (notify_tx, notify_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel::<LedgerResult<()>>();

        tokio::spawn(async move {
            let config = RpcSignatureSubscribeConfig {
                commitment: Some(commitment),
                enable_received_notification: Some(false),
            };

            let (mut notifications, unsubscribe) =
                match pubsub.signature_subscribe(&signature, Some(config)).await {
                    Ok(subscription) => {
                        let _ = ready_tx.send(Ok(()));
                        subscription
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(LedgerError::Subscription(e.to_string())));
                        return;
                    }
                };

            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Signature subscription for {} cancelled", signature);
                }
                response = notifications.next() => {
                    if let Some(response) = response {
                        if let RpcSignatureResult::ProcessedSignature(processed) = response.value {
                            let state = match processed.err {
                                None => SignatureState::Succeeded,
                                Some(err) => SignatureState::Failed(err.to_string()),
                            };
                            let _ = notify_tx.send(state);
                        }
                    } else {
                        warn!("Signature subscription stream for {} closed", signature);
                    }
                }
            }

            drop(notifications);
            unsubscribe().await;
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(SignatureSubscription::new(notify_rx, cancel)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(LedgerError::Subscription(
                "subscription task exited before registering".to_string(),
            )),
        }
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> LedgerResult<u64> {
        Ok(self.rpc_client.get_balance(pubkey).await?)
    }
}
