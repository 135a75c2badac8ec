use super::Context;
use crate::{
    config::{load_keypair, parse_pubkey, to_base_units},
    error::{CliError, CliResult},
};
use courier_submit::{Instruction, Keypair, Pubkey, Signature, SubmitOptions};
use solana_sdk::signature::Signer;
use spl_associated_token_account::get_associated_token_address;
use std::path::PathBuf;

pub async fn execute(
    ctx: &Context,
    keypair_path: PathBuf,
    mint: String,
    amount: u64,
    decimals: u8,
) -> CliResult<()> {
    println!("🔥 Preparing token burn...");

    let owner = load_keypair(&keypair_path)?;
    let mint = parse_pubkey(&mint)?;
    let raw_amount = to_base_units(amount, decimals)?;
    let options = ctx.submit_options(None)?;

    println!("   Owner: {}", owner.pubkey());
    println!("   Mint:  {}", mint);

    let signature = burn_from_wallet(ctx, &owner, &mint, raw_amount, decimals, &options).await?;

    println!("✅ Burned {} tokens", amount);
    println!("   Signature: {}", signature);
    Ok(())
}

/// Burn instruction against the owner's associated token account
pub fn burn_instruction(
    owner: &Pubkey,
    mint: &Pubkey,
    raw_amount: u64,
    decimals: u8,
) -> CliResult<Instruction> {
    let token_account = get_associated_token_address(owner, mint);
    spl_token::instruction::burn_checked(
        &spl_token::id(),
        &token_account,
        mint,
        owner,
        &[],
        raw_amount,
        decimals,
    )
    .map_err(|e| CliError::InvalidConfig(format!("Failed to build burn: {}", e)))
}

/// Check the token balance, then burn through the engine
pub async fn burn_from_wallet(
    ctx: &Context,
    owner: &Keypair,
    mint: &Pubkey,
    raw_amount: u64,
    decimals: u8,
    options: &SubmitOptions,
) -> CliResult<Signature> {
    let token_account = get_associated_token_address(&owner.pubkey(), mint);
    let available = ctx.token_balance(&token_account).await?;
    if available < raw_amount {
        return Err(CliError::InsufficientFunds {
            required: raw_amount,
            available,
        });
    }

    let instruction = burn_instruction(&owner.pubkey(), mint, raw_amount, decimals)?;
    Ok(ctx.client.submit(&[instruction], owner, options).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_instruction_targets_owner_token_account() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ix = burn_instruction(&owner, &mint, 3_900_000_000_000_000, 9).unwrap();

        assert_eq!(ix.program_id, spl_token::id());
        assert_eq!(
            ix.accounts[0].pubkey,
            get_associated_token_address(&owner, &mint)
        );
        assert_eq!(ix.accounts[1].pubkey, mint);
        assert_eq!(ix.accounts[2].pubkey, owner);
        assert!(ix.accounts[2].is_signer);
    }
}
