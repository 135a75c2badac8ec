use super::Context;
use crate::{
    config::{load_keypair, parse_pubkey, to_base_units},
    error::{CliError, CliResult},
};
use solana_sdk::signature::Signer;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::path::PathBuf;

pub async fn execute(
    ctx: &Context,
    keypair_path: PathBuf,
    mint: String,
    recipient: String,
    amount: u64,
    decimals: u8,
) -> CliResult<()> {
    println!("🪙 Preparing token transfer...");

    let owner = load_keypair(&keypair_path)?;
    let mint = parse_pubkey(&mint)?;
    let recipient = parse_pubkey(&recipient)?;
    let raw_amount = to_base_units(amount, decimals)?;
    let options = ctx.submit_options(None)?;

    let source = get_associated_token_address(&owner.pubkey(), &mint);
    let destination = get_associated_token_address(&recipient, &mint);
    println!("   From: {} (token account {})", owner.pubkey(), source);
    println!("   To:   {} (token account {})", recipient, destination);

    let available = ctx.token_balance(&source).await?;
    if available < raw_amount {
        return Err(CliError::InsufficientFunds {
            required: raw_amount,
            available,
        });
    }

    let instructions = vec![
        create_associated_token_account_idempotent(
            &owner.pubkey(),
            &recipient,
            &mint,
            &spl_token::id(),
        ),
        spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &source,
            &mint,
            &destination,
            &owner.pubkey(),
            &[],
            raw_amount,
            decimals,
        )
        .map_err(|e| CliError::InvalidConfig(format!("Failed to build transfer: {}", e)))?,
    ];

    println!("🚀 Transferring {} tokens...", amount);
    let signature = ctx.client.submit(&instructions, &owner, &options).await?;

    println!("✅ Transfer confirmed");
    println!("   Signature: {}", signature);
    Ok(())
}
