use super::{burn::burn_from_wallet, Context};
use crate::{
    config::{to_base_units, BurnBatchConfig, RetryConfig, WalletFile},
    error::CliResult,
};
use serde::{Deserialize, Serialize};
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::{fs, future::Future, path::PathBuf, time::Duration};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnStatus {
    Success,
    Failed,
}

/// One burn attempt for one wallet, as written to the results file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRecord {
    pub wallet: String,
    pub status: BurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `None` for the first pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_round: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnResults {
    pub successful: usize,
    /// Wallets still failing after every retry round
    pub failed: usize,
    pub transactions: Vec<BurnRecord>,
}

/// Timing of a batch run
#[derive(Debug, Clone)]
pub struct BatchSchedule {
    pub delay_between_burns: Duration,
    pub retry: RetryConfig,
}

pub async fn execute(ctx: &Context, config_path: PathBuf) -> CliResult<()> {
    println!("🔥 Starting batch token burn...");

    let config = BurnBatchConfig::load(&config_path)?;
    let mint = config.mint_pubkey()?;
    let raw_amount = to_base_units(config.amount, config.decimals)?;
    let options = ctx.submit_options(Some(&config.engine))?;

    println!("   Mint: {}", mint);
    println!("   Amount per wallet: {}", config.amount);

    let wallet_file = WalletFile::load(&config.wallets_file)?;
    let keypairs = wallet_file
        .wallets
        .iter()
        .map(|wallet| wallet.keypair())
        .collect::<CliResult<Vec<Keypair>>>()?;
    println!("✅ Loaded {} wallets", keypairs.len());

    let labels: Vec<String> = keypairs.iter().map(|k| k.pubkey().to_string()).collect();
    let schedule = BatchSchedule {
        delay_between_burns: config.delay_between_burns(),
        retry: config.retry.clone(),
    };

    let results = run_batch(&labels, &schedule, |index| {
        let owner = &keypairs[index];
        let options = &options;
        async move {
            burn_from_wallet(ctx, owner, &mint, raw_amount, config.decimals, options).await
        }
    })
    .await;

    println!("\n📊 Batch burn summary");
    println!("------------------------");
    println!("Total wallets: {}", labels.len());
    println!("Successful burns: {}", results.successful);
    println!("Failed burns: {}", results.failed);

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let results_path = config
        .output_dir
        .join(format!("burn_results_{}.json", timestamp));
    fs::write(&results_path, serde_json::to_string_pretty(&results)?)?;
    println!("📄 Detailed results saved to: {}", results_path.display());

    Ok(())
}

/// First pass over every wallet, then retry rounds over the ones that failed
///
/// `burn` is called with an index into `wallets`.
pub async fn run_batch<F, Fut>(
    wallets: &[String],
    schedule: &BatchSchedule,
    mut burn: F,
) -> BurnResults
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = CliResult<Signature>>,
{
    let mut results = BurnResults::default();
    let mut pending = Vec::new();

    for (index, wallet) in wallets.iter().enumerate() {
        println!(
            "\n📦 Burning for wallet {} of {}: {}",
            index + 1,
            wallets.len(),
            wallet
        );
        if !record(&mut results, wallet, burn(index).await, None) {
            pending.push(index);
        }

        if index + 1 < wallets.len() {
            tokio::time::sleep(schedule.delay_between_burns).await;
        }
    }

    info!(
        successful = results.successful,
        failed = pending.len(),
        "First pass complete"
    );

    for round in 1..=schedule.retry.max_rounds {
        if pending.is_empty() {
            break;
        }
        println!(
            "\n🔄 Retry round {}/{} for {} wallet(s)",
            round,
            schedule.retry.max_rounds,
            pending.len()
        );

        let delay = schedule.retry.delay_for_round(round);
        let mut still_failing = Vec::new();
        for index in pending {
            tokio::time::sleep(delay).await;
            if !record(&mut results, &wallets[index], burn(index).await, Some(round)) {
                still_failing.push(index);
            }
        }
        pending = still_failing;
    }

    results.failed = pending.len();
    results
}

fn record(
    results: &mut BurnResults,
    wallet: &str,
    outcome: CliResult<Signature>,
    retry_round: Option<u32>,
) -> bool {
    match outcome {
        Ok(signature) => {
            println!("✅ {}: {}", wallet, signature);
            results.successful += 1;
            results.transactions.push(BurnRecord {
                wallet: wallet.to_string(),
                status: BurnStatus::Success,
                signature: Some(signature.to_string()),
                error: None,
                retry_round,
            });
            true
        }
        Err(err) => {
            println!("❌ {}: {}", wallet, err);
            warn!(%wallet, error = %err, ?retry_round, "Burn failed");
            results.transactions.push(BurnRecord {
                wallet: wallet.to_string(),
                status: BurnStatus::Failed,
                signature: None,
                error: Some(err.to_string()),
                retry_round,
            });
            false
        }
    }
}
