pub mod balance;
pub mod burn;
pub mod burn_batch;
pub mod send_sol;
pub mod transfer_token;

use crate::{
    config::EngineOverrides,
    error::{CliError, CliResult},
};
use courier_submit::{RpcClient, RpcLedger, SubmitClient, SubmitOptions};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

/// Shared handles for every command
pub struct Context {
    pub client: SubmitClient,
    pub rpc_client: Arc<RpcClient>,
    pub engine: EngineOverrides,
}

impl Context {
    pub fn new(rpc_url: &str, ws_url: Option<&str>, engine: EngineOverrides) -> Self {
        let ledger = RpcLedger::from_urls(rpc_url, ws_url);
        let rpc_client = ledger.rpc_client().clone();
        Self {
            client: SubmitClient::new(Arc::new(ledger)),
            rpc_client,
            engine,
        }
    }

    /// Engine options from flags, falling back to `file` for unset values
    pub fn submit_options(&self, file: Option<&EngineOverrides>) -> CliResult<SubmitOptions> {
        match file {
            Some(file) => self.engine.or(file).submit_options(),
            None => self.engine.submit_options(),
        }
    }

    /// Raw token amount held in `token_account`
    pub async fn token_balance(&self, token_account: &Pubkey) -> CliResult<u64> {
        let balance = self
            .rpc_client
            .get_token_account_balance(token_account)
            .await?;
        balance.amount.parse::<u64>().map_err(|e| {
            CliError::InvalidConfig(format!(
                "unexpected token amount '{}': {}",
                balance.amount, e
            ))
        })
    }
}
