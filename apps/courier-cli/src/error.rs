use courier_submit::SubmitError;
use solana_client::client_error::ClientError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Public key {expected} does not match the private key (derived {actual})")]
    WalletMismatch { expected: String, actual: String },

    #[error("Invalid public key '{0}'")]
    InvalidPubkey(String),

    #[error("Insufficient balance: have {available} lamports, need {required}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("RPC error: {0}")]
    Rpc(#[from] ClientError),

    #[error("Submission failed: {0}")]
    Submission(#[from] SubmitError),
}
