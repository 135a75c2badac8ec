use async_trait::async_trait;
use courier_submit::{
    Ledger, LedgerError, LedgerResult, RecencyMarker, SendOptions, SignatureState,
    SignatureSubscription, SimulationReport,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, compute_budget::ComputeBudgetInstruction, hash::Hash,
    pubkey::Pubkey, signature::Signature, transaction::Transaction,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};
use tokio::{sync::oneshot, time::Instant};
use tokio_util::sync::CancellationToken;

/// Blocks a blockhash stays valid for on the mock chain
pub const BLOCKHASH_VALIDITY_BLOCKS: u64 = 150;

/// How an accepted transaction becomes visible to the detection channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landing {
    state: SignatureState,
    poll_after: Option<Duration>,
    notify_after: Option<Duration>,
    late: bool,
}

impl Landing {
    /// Visible to the first status poll
    pub fn confirmed_on_poll() -> Self {
        Self::confirmed_on_poll_after(Duration::ZERO)
    }

    /// Visible to status polls once `after` has elapsed since the send
    pub fn confirmed_on_poll_after(after: Duration) -> Self {
        Self {
            state: SignatureState::Succeeded,
            poll_after: Some(after),
            notify_after: None,
            late: false,
        }
    }

    /// Delivered only through the signature subscription
    pub fn confirmed_via_subscription(after: Duration) -> Self {
        Self {
            state: SignatureState::Succeeded,
            poll_after: None,
            notify_after: Some(after),
            late: false,
        }
    }

    /// Both channels observe the confirmation at the same moment
    pub fn confirmed_on_both(after: Duration) -> Self {
        Self {
            state: SignatureState::Succeeded,
            poll_after: Some(after),
            notify_after: Some(after),
            late: false,
        }
    }

    pub fn failed_on_chain(reason: &str) -> Self {
        Self {
            state: SignatureState::Failed(reason.to_string()),
            poll_after: Some(Duration::ZERO),
            notify_after: Some(Duration::ZERO),
            late: false,
        }
    }

    /// Never observed by any channel
    pub fn never() -> Self {
        Self {
            state: SignatureState::Succeeded,
            poll_after: None,
            notify_after: None,
            late: false,
        }
    }

    /// Invisible until a later send is rejected as a duplicate
    pub fn lands_late() -> Self {
        Self {
            late: true,
            ..Self::never()
        }
    }
}

/// Scripted response to one `send` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendScript {
    Accept(Landing),
    RateLimited,
    Reject(String),
    /// Rejected because an earlier send actually landed
    DuplicateOfEarlier,
}

/// A transaction the mock accepted
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub signature: Signature,
    pub blockhash: Hash,
    pub fee_bid: Option<u64>,
    pub sent_at: Instant,
}

#[derive(Debug)]
struct SubscriptionRecord {
    signature: Signature,
    token: CancellationToken,
    // Held so a subscription without a scripted notification stays pending
    _idle_sender: Option<oneshot::Sender<SignatureState>>,
}

#[derive(Debug)]
struct LandedSignature {
    landing: Landing,
    sent_at: Instant,
}

#[derive(Debug)]
struct MockState {
    block_height: u64,
    fetched_markers: Vec<(RecencyMarker, Instant)>,
    blockhash_failures: VecDeque<LedgerError>,
    simulation_rejections: VecDeque<String>,
    simulations: usize,
    scripts: VecDeque<SendScript>,
    send_calls: usize,
    sent: Vec<SentTransaction>,
    landings: HashMap<Signature, LandedSignature>,
    late_revealed: bool,
    status_queries: usize,
    subscriptions: Vec<SubscriptionRecord>,
    subscriptions_enabled: bool,
    balance: u64,
}

/// Scripted in-memory [`Ledger`]
///
/// Every `send` pops the next [`SendScript`]; once the script runs out, sends
/// are accepted and never land. Time is measured with `tokio::time::Instant`,
/// so tests run on a paused clock.
pub struct MockLedger {
    state: Mutex<MockState>,
    notifications_delivered: Arc<AtomicUsize>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                block_height: 1_000,
                fetched_markers: Vec::new(),
                blockhash_failures: VecDeque::new(),
                simulation_rejections: VecDeque::new(),
                simulations: 0,
                scripts: VecDeque::new(),
                send_calls: 0,
                sent: Vec::new(),
                landings: HashMap::new(),
                late_revealed: false,
                status_queries: 0,
                subscriptions: Vec::new(),
                subscriptions_enabled: true,
                balance: 10_000_000_000,
            }),
            notifications_delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock ledger state poisoned")
    }

    pub fn script(&self, send: SendScript) -> &Self {
        self.state().scripts.push_back(send);
        self
    }

    pub fn fail_next_blockhash(&self, err: LedgerError) -> &Self {
        self.state().blockhash_failures.push_back(err);
        self
    }

    pub fn reject_next_simulation(&self, reason: &str) -> &Self {
        self.state()
            .simulation_rejections
            .push_back(reason.to_string());
        self
    }

    pub fn disable_subscriptions(&self) -> &Self {
        self.state().subscriptions_enabled = false;
        self
    }

    pub fn set_balance(&self, lamports: u64) -> &Self {
        self.state().balance = lamports;
        self
    }

    pub fn fetched_markers(&self) -> Vec<RecencyMarker> {
        self.state()
            .fetched_markers
            .iter()
            .map(|(marker, _)| *marker)
            .collect()
    }

    pub fn blockhash_fetch_times(&self) -> Vec<Instant> {
        self.state()
            .fetched_markers
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state().sent.clone()
    }

    pub fn send_calls(&self) -> usize {
        self.state().send_calls
    }

    pub fn simulations(&self) -> usize {
        self.state().simulations
    }

    pub fn status_queries(&self) -> usize {
        self.state().status_queries
    }

    pub fn subscriptions(&self) -> usize {
        self.state().subscriptions.len()
    }

    /// Subscriptions whose listener has not been released
    pub fn active_subscriptions(&self) -> usize {
        self.state()
            .subscriptions
            .iter()
            .filter(|s| !s.token.is_cancelled())
            .count()
    }

    pub fn subscription_released(&self, signature: &Signature) -> bool {
        self.state()
            .subscriptions
            .iter()
            .filter(|s| &s.signature == signature)
            .all(|s| s.token.is_cancelled())
    }

    pub fn notifications_delivered(&self) -> usize {
        self.notifications_delivered.load(Ordering::SeqCst)
    }

    fn visible_state(&self, state: &MockState, signature: &Signature) -> Option<SignatureState> {
        let landed = state.landings.get(signature)?;
        if landed.landing.late && state.late_revealed {
            return Some(landed.landing.state.clone());
        }
        match landed.landing.poll_after {
            Some(after) if Instant::now().duration_since(landed.sent_at) >= after => {
                Some(landed.landing.state.clone())
            }
            _ => None,
        }
    }
}

/// Compute unit price carried by a transaction's compute budget instruction
pub fn compute_unit_price(transaction: &Transaction) -> Option<u64> {
    let program_id = ComputeBudgetInstruction::set_compute_unit_price(0).program_id;
    let message = &transaction.message;

    message.instructions.iter().find_map(|ix| {
        let key = message.account_keys.get(ix.program_id_index as usize)?;
        if *key != program_id || ix.data.first() != Some(&3) || ix.data.len() < 9 {
            return None;
        }
        let mut price = [0u8; 8];
        price.copy_from_slice(&ix.data[1..9]);
        Some(u64::from_le_bytes(price))
    })
}

#[async_trait]
impl Ledger for MockLedger {
    async fn latest_blockhash(&self, _commitment: CommitmentConfig) -> LedgerResult<RecencyMarker> {
        let mut state = self.state();
        if let Some(err) = state.blockhash_failures.pop_front() {
            return Err(err);
        }

        state.block_height += 1;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&state.block_height.to_le_bytes());
        let marker = RecencyMarker {
            blockhash: Hash::new_from_array(bytes),
            last_valid_block_height: state.block_height + BLOCKHASH_VALIDITY_BLOCKS,
        };
        state.fetched_markers.push((marker, Instant::now()));
        Ok(marker)
    }

    async fn simulate(
        &self,
        _transaction: &Transaction,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<SimulationReport> {
        let mut state = self.state();
        state.simulations += 1;
        Ok(SimulationReport {
            err: state.simulation_rejections.pop_front(),
            units_consumed: Some(450),
            logs: vec!["Program 11111111111111111111111111111111 invoke [1]".to_string()],
        })
    }

    async fn send(
        &self,
        transaction: &Transaction,
        _options: SendOptions,
    ) -> LedgerResult<Signature> {
        let mut state = self.state();
        state.send_calls += 1;

        let script = state
            .scripts
            .pop_front()
            .unwrap_or(SendScript::Accept(Landing::never()));

        match script {
            SendScript::RateLimited => Err(LedgerError::RateLimited(
                "HTTP status client error (429 Too Many Requests)".to_string(),
            )),
            SendScript::Reject(message) => Err(LedgerError::Rejected(message)),
            SendScript::DuplicateOfEarlier => {
                state.late_revealed = true;
                Err(LedgerError::Rejected(
                    "Transaction simulation failed: This transaction has already been processed"
                        .to_string(),
                ))
            }
            SendScript::Accept(landing) => {
                let signature = transaction.signatures[0];
                let sent_at = Instant::now();
                state.sent.push(SentTransaction {
                    signature,
                    blockhash: transaction.message.recent_blockhash,
                    fee_bid: compute_unit_price(transaction),
                    sent_at,
                });
                state
                    .landings
                    .insert(signature, LandedSignature { landing, sent_at });
                Ok(signature)
            }
        }
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<Option<SignatureState>> {
        let mut state = self.state();
        state.status_queries += 1;
        Ok(self.visible_state(&state, signature))
    }

    async fn subscribe_signature(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> LedgerResult<SignatureSubscription> {
        let mut state = self.state();
        if !state.subscriptions_enabled {
            return Err(LedgerError::Subscription(
                "websocket endpoint unavailable".to_string(),
            ));
        }

        let token = CancellationToken::new();
        let (sender, receiver) = oneshot::channel();

        let scheduled = state.landings.get(signature).and_then(|landed| {
            landed
                .landing
                .notify_after
                .map(|after| (landed.sent_at + after, landed.landing.state.clone()))
        });

        let idle_sender = match scheduled {
            Some((deadline, notification)) => {
                let listener = token.clone();
                let delivered = self.notifications_delivered.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = listener.cancelled() => {}
                        _ = tokio::time::sleep_until(deadline) => {
                            if sender.send(notification).is_ok() {
                                delivered.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                });
                None
            }
            None => Some(sender),
        };

        state.subscriptions.push(SubscriptionRecord {
            signature: *signature,
            token: token.clone(),
            _idle_sender: idle_sender,
        });

        Ok(SignatureSubscription::new(receiver, token))
    }

    async fn get_balance(&self, _pubkey: &Pubkey) -> LedgerResult<u64> {
        Ok(self.state().balance)
    }
}
