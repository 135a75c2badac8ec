use super::Context;
use crate::{
    config::{load_keypair, parse_pubkey},
    error::{CliError, CliResult},
};
use solana_sdk::{
    native_token::{lamports_to_sol, sol_to_lamports},
    signature::Signer,
    system_instruction,
};
use std::path::PathBuf;

pub async fn execute(
    ctx: &Context,
    keypair_path: PathBuf,
    recipient: String,
    amount_sol: f64,
) -> CliResult<()> {
    println!("💸 Preparing SOL transfer...");

    if !amount_sol.is_finite() || amount_sol <= 0.0 {
        return Err(CliError::InvalidConfig(format!(
            "amount must be a positive number of SOL, got {}",
            amount_sol
        )));
    }

    let sender = load_keypair(&keypair_path)?;
    let recipient = parse_pubkey(&recipient)?;
    let lamports = sol_to_lamports(amount_sol);

    let mut options = ctx.submit_options(None)?;
    // Re-checked by the engine on every attempt, fees included
    options.min_payer_balance = Some(lamports);

    let balance = ctx.client.get_balance(&sender.pubkey()).await?;
    println!(
        "✅ Sender: {} ({} SOL)",
        sender.pubkey(),
        lamports_to_sol(balance)
    );
    if balance < lamports {
        return Err(CliError::InsufficientFunds {
            required: lamports,
            available: balance,
        });
    }

    let instruction = system_instruction::transfer(&sender.pubkey(), &recipient, lamports);

    println!("🚀 Sending {} SOL to {}...", amount_sol, recipient);
    let signature = ctx.client.submit(&[instruction], &sender, &options).await?;

    println!("✅ Transfer confirmed");
    println!("   Signature: {}", signature);
    Ok(())
}
