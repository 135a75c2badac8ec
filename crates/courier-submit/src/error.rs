use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    rpc_request::RpcError,
};
use solana_sdk::signature::Signature;
use thiserror::Error;

pub type SubmitResult<T> = Result<T, SubmitError>;
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors reported by a [`crate::Ledger`] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("subscription error: {0}")]
    Subscription(String),
}

impl LedgerError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LedgerError::RateLimited(_))
    }
}

impl From<ClientError> for LedgerError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        if message.contains("429") || message.to_lowercase().contains("too many requests") {
            return LedgerError::RateLimited(message);
        }

        match err.kind {
            ClientErrorKind::RpcError(RpcError::RpcResponseError { .. })
            | ClientErrorKind::TransactionError(_)
            | ClientErrorKind::SigningError(_) => LedgerError::Rejected(message),
            _ => LedgerError::Transport(message),
        }
    }
}

/// Failures while preparing an attempt, before anything is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("failed to fetch recent blockhash: {0}")]
    Blockhash(LedgerError),

    #[error("failed to fetch payer balance: {0}")]
    Balance(LedgerError),

    #[error("simulation request failed: {0}")]
    Simulation(LedgerError),

    #[error("simulation rejected transaction: {reason}")]
    SimulationRejected { reason: String, logs: Vec<String> },
}

impl BuildError {
    fn is_rate_limited(&self) -> bool {
        match self {
            BuildError::Blockhash(err) | BuildError::Balance(err) | BuildError::Simulation(err) => {
                err.is_rate_limited()
            }
            BuildError::SimulationRejected { .. } => false,
        }
    }
}

/// Errors returned by [`crate::SubmitClient::submit`]
///
/// Only [`SubmitError::Exhausted`] and the precondition variants
/// (`NoInstructions`, `InvalidConfig`, `Signing`, `InsufficientBalance`) ever
/// reach a caller. The remaining variants describe why a single attempt failed
/// and show up as the `last` cause of an exhausted submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("No instructions provided")]
    NoInstructions,

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error("Insufficient balance: need {required} lamports, have {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Transaction build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Transaction send failed: {0}")]
    Submission(String),

    #[error("Rate limited by RPC endpoint: {0}")]
    RateLimited(String),

    #[error("Transaction {signature} failed on-chain: {reason}")]
    OnChainFailure { signature: Signature, reason: String },

    #[error("Transaction {0} was not confirmed before the deadline")]
    ConfirmationTimeout(Signature),

    #[error("Transaction failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<SubmitError>,
    },
}

impl SubmitError {
    /// Whether another attempt with a fresh build may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SubmitError::Build(_)
                | SubmitError::Submission(_)
                | SubmitError::RateLimited(_)
                | SubmitError::OnChainFailure { .. }
                | SubmitError::ConfirmationTimeout(_)
        )
    }

    /// Rate limiting gets its own backoff and leaves the fee bid alone
    pub fn is_rate_limited(&self) -> bool {
        match self {
            SubmitError::RateLimited(_) => true,
            SubmitError::Build(err) => err.is_rate_limited(),
            _ => false,
        }
    }

    /// The root cause, looking through `Exhausted`
    pub fn last_cause(&self) -> &SubmitError {
        match self {
            SubmitError::Exhausted { last, .. } => last.last_cause(),
            other => other,
        }
    }
}

impl From<LedgerError> for SubmitError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::RateLimited(message) => SubmitError::RateLimited(message),
            other => SubmitError::Submission(other.to_string()),
        }
    }
}
