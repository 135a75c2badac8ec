/*!
# Courier Testing

Scripted ledger and fixtures for exercising the submission engine without a
cluster. Scenario tests live in `tests/` and run on tokio's paused clock, so
confirmation deadlines and backoffs cost no wall time.
*/

mod mock_ledger;

pub use mock_ledger::{
    compute_unit_price, Landing, MockLedger, SendScript, SentTransaction,
    BLOCKHASH_VALIDITY_BLOCKS,
};

use courier_submit::{FeeBid, SubmitClient, SubmitOptions};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};
use std::{sync::Arc, time::Duration};

/// Initial fee bid used by [`test_options`]
pub const TEST_INITIAL_FEE_BID: u64 = 1_000;

/// Backoff after a rate-limited attempt in [`test_options`]
pub const TEST_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(7);

/// Options with short, distinct timings
pub fn test_options() -> SubmitOptions {
    let mut options = SubmitOptions {
        max_attempts: 3,
        initial_fee_bid: FeeBid::from_micro_lamports(TEST_INITIAL_FEE_BID),
        fee_ceiling: Some(FeeBid::from_micro_lamports(1_000_000)),
        confirmation_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_secs(2),
        rate_limit_backoff: TEST_RATE_LIMIT_BACKOFF,
        ..Default::default()
    };
    options.retry_backoff.initial_interval = Duration::from_secs(1);
    options.retry_backoff.current_interval = Duration::from_secs(1);
    options
}

/// Engine wired to a fresh [`MockLedger`]
pub struct TestFixture {
    pub ledger: Arc<MockLedger>,
    pub client: SubmitClient,
    pub payer: Keypair,
}

impl TestFixture {
    pub fn new() -> Self {
        let ledger = Arc::new(MockLedger::new());
        let client = SubmitClient::new(ledger.clone());
        Self {
            ledger,
            client,
            payer: Keypair::new(),
        }
    }

    /// A single lamport transfer out of the payer
    pub fn transfer_instructions(&self) -> Vec<Instruction> {
        vec![system_instruction::transfer(
            &self.payer.pubkey(),
            &Pubkey::new_unique(),
            1_000,
        )]
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Route engine logs to the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("courier_submit=debug")),
        )
        .with_test_writer()
        .try_init();
}
