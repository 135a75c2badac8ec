/*!
# Courier Submit

Resilient transaction submission for Solana: every attempt gets a fresh
blockhash and an escalating priority fee, confirmation is detected by racing
signature polling against a signature subscription, and the caller gets a
single verdict.

## Quick Start

```rust,no_run
use courier_submit::{RpcLedger, SubmitClient, SubmitOptions};
use solana_sdk::{instruction::Instruction, signature::Keypair};
use std::sync::Arc;

# async fn example() -> Result<(), Box<dyn std::error::Error>> {
let ledger = Arc::new(RpcLedger::from_urls("https://api.devnet.solana.com", None));
let client = SubmitClient::new(ledger);
let payer = Keypair::new();

let instructions: Vec<Instruction> = vec![/* your instructions */];

let signature = client
    .submit(&instructions, &payer, &SubmitOptions::default())
    .await?;
println!("Confirmed: {}", signature);
# Ok(())
# }
```

## Custom Options

```rust
# use courier_submit::{FeeBid, SubmitOptions};
# use std::time::Duration;
let options = SubmitOptions {
    max_attempts: 3,
    initial_fee_bid: FeeBid::from_micro_lamports(50_000),
    fee_ceiling: Some(FeeBid::from_micro_lamports(400_000)),
    confirmation_timeout: Duration::from_secs(30),
    ..Default::default()
};
assert!(options.validate().is_ok());
```

## Duplicate landings

Retries rebuild and re-sign the transaction, so a retry is a different
transaction from the ledger's point of view. If an attempt the engine gave up
on lands later, the instructions run twice. Earlier signatures are re-checked
before a failed send or a terminal error is reported and before the submission
is declared exhausted, but callers moving value should still treat `Exhausted` as "not
observed", not as "definitely did not happen".
*/

mod builder;
mod channel;
mod config;
mod coordinator;
mod error;
mod fee;
mod ledger;
mod rpc_ledger;
mod tracker;

pub use builder::{TransactionAttempt, TransactionBuilder};
pub use channel::SubmissionChannel;
pub use config::SubmitOptions;
pub use coordinator::{AttemptOutcome, AttemptRecord, SubmissionReport, SubmitClient};
pub use error::{BuildError, LedgerError, LedgerResult, SubmitError, SubmitResult};
pub use fee::{FeeBid, FeePolicy, DEFAULT_COMPUTE_UNIT_LIMIT, LAMPORTS_PER_SIGNATURE};
pub use ledger::{
    Ledger, RecencyMarker, SendOptions, SignatureState, SignatureSubscription, SimulationReport,
};
pub use rpc_ledger::{websocket_url_for, RpcLedger};
pub use tracker::{
    ConfirmationOutcome, ConfirmationTracker, DetectionChannel, Resolution, ResolutionSlot,
};

// Re-export key Solana types for convenience
pub use solana_client::nonblocking::rpc_client::RpcClient;
pub use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
