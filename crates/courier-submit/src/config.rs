use crate::{
    fee::{FeeBid, FeePolicy},
    SubmitError, SubmitResult,
};
use backoff::ExponentialBackoff;
use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

/// Options for a single logical submission
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Maximum number of build/send/confirm attempts
    pub max_attempts: usize,

    /// Priority fee bid for the first attempt
    pub initial_fee_bid: FeeBid,

    /// Escalated bids never exceed this value
    pub fee_ceiling: Option<FeeBid>,

    /// Commitment level a signature must reach to count as confirmed
    pub commitment: CommitmentConfig,

    /// Backup deadline for a single attempt's confirmation
    pub confirmation_timeout: Duration,

    /// Interval between signature status polls
    pub poll_interval: Duration,

    /// Explicit compute unit limit instruction, if any
    pub compute_unit_limit: Option<u32>,

    /// Whether to simulate before sending and abort the attempt on error
    pub simulate_before_send: bool,

    /// Backoff strategy between attempts that failed for ordinary reasons
    pub retry_backoff: ExponentialBackoff,

    /// Delay after the endpoint signalled rate limiting
    pub rate_limit_backoff: Duration,

    /// Lamports the payer must hold beyond fees, checked on every build
    pub min_payer_balance: Option<u64>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_fee_bid: FeeBid::from_micro_lamports(10_000),
            fee_ceiling: Some(FeeBid::from_micro_lamports(2_000_000)),
            commitment: CommitmentConfig::confirmed(),
            confirmation_timeout: Duration::from_secs(45),
            poll_interval: Duration::from_secs(2),
            compute_unit_limit: None,
            simulate_before_send: true,
            retry_backoff: ExponentialBackoff {
                initial_interval: Duration::from_secs(1),
                max_interval: Duration::from_secs(30),
                max_elapsed_time: None,
                multiplier: 2.0,
                randomization_factor: 0.0,
                ..Default::default()
            },
            rate_limit_backoff: Duration::from_secs(10),
            min_payer_balance: None,
        }
    }
}

impl SubmitOptions {
    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy::new(self.initial_fee_bid, self.fee_ceiling)
    }

    pub fn validate(&self) -> SubmitResult<()> {
        if self.max_attempts == 0 {
            return Err(SubmitError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(SubmitError::InvalidConfig(
                "confirmation_timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(SubmitError::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if let Some(ceiling) = self.fee_ceiling {
            if ceiling < self.initial_fee_bid {
                return Err(SubmitError::InvalidConfig(format!(
                    "fee ceiling ({}) is below the initial bid ({})",
                    ceiling, self.initial_fee_bid
                )));
            }
        }
        if self.compute_unit_limit == Some(0) {
            return Err(SubmitError::InvalidConfig(
                "compute_unit_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
