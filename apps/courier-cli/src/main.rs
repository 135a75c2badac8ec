use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::Context;
use config::EngineOverrides;
use error::CliResult;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier - resilient transaction submission on Solana")]
#[command(version)]
struct Cli {
    /// Solana RPC URL
    #[arg(
        short,
        long,
        global = true,
        default_value = "https://api.mainnet-beta.solana.com"
    )]
    rpc_url: String,

    /// Websocket URL for signature subscriptions (derived from the RPC URL if omitted)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    engine: EngineOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer SOL from a keypair
    SendSol {
        /// Sender keypair file
        #[arg(short, long)]
        keypair: PathBuf,

        /// Recipient address
        recipient: String,

        /// Amount in SOL
        amount: f64,
    },

    /// Transfer SPL tokens, creating the recipient's token account if needed
    TransferToken {
        /// Sender keypair file
        #[arg(short, long)]
        keypair: PathBuf,

        /// Token mint
        #[arg(short, long)]
        mint: String,

        /// Recipient wallet address
        recipient: String,

        /// Whole tokens to transfer
        amount: u64,

        /// Token decimals
        #[arg(short, long, default_value = "9")]
        decimals: u8,
    },

    /// Burn SPL tokens from the signer's token account
    Burn {
        /// Token owner keypair file
        #[arg(short, long)]
        keypair: PathBuf,

        /// Token mint
        #[arg(short, long)]
        mint: String,

        /// Whole tokens to burn
        amount: u64,

        /// Token decimals
        #[arg(short, long, default_value = "9")]
        decimals: u8,
    },

    /// Burn tokens from every wallet in a wallet file, retrying failures in rounds
    BurnBatch {
        /// Batch configuration file (YAML)
        config: PathBuf,
    },

    /// Show SOL balance and, with a mint, the token balance of an address
    Balance {
        /// Wallet address
        address: String,

        /// Token mint
        #[arg(short, long)]
        mint: Option<String>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let ctx = Context::new(&cli.rpc_url, cli.ws_url.as_deref(), cli.engine);

    match cli.command {
        Commands::SendSol {
            keypair,
            recipient,
            amount,
        } => commands::send_sol::execute(&ctx, keypair, recipient, amount).await,

        Commands::TransferToken {
            keypair,
            mint,
            recipient,
            amount,
            decimals,
        } => {
            commands::transfer_token::execute(&ctx, keypair, mint, recipient, amount, decimals)
                .await
        }

        Commands::Burn {
            keypair,
            mint,
            amount,
            decimals,
        } => commands::burn::execute(&ctx, keypair, mint, amount, decimals).await,

        Commands::BurnBatch { config } => commands::burn_batch::execute(&ctx, config).await,

        Commands::Balance { address, mint } => {
            commands::balance::execute(&ctx, address, mint).await
        }
    }
}
