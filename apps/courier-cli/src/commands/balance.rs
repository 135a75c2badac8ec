use super::Context;
use crate::{config::parse_pubkey, error::CliResult};
use solana_sdk::native_token::lamports_to_sol;
use spl_associated_token_account::get_associated_token_address;

pub async fn execute(ctx: &Context, address: String, mint: Option<String>) -> CliResult<()> {
    let owner = parse_pubkey(&address)?;

    let lamports = ctx.rpc_client.get_balance(&owner).await?;
    println!("👛 Wallet: {}", owner);
    println!("   SOL: {} ({} lamports)", lamports_to_sol(lamports), lamports);

    if let Some(mint) = mint {
        let mint = parse_pubkey(&mint)?;
        let token_account = get_associated_token_address(&owner, &mint);

        match ctx.rpc_client.get_token_account_balance(&token_account).await {
            Ok(balance) => println!(
                "   Token {}: {} (raw {}, {} decimals)",
                mint, balance.ui_amount_string, balance.amount, balance.decimals
            ),
            // A missing token account simply holds nothing
            Err(_) => println!("   Token {}: 0 (no token account {})", mint, token_account),
        }
    }

    Ok(())
}
