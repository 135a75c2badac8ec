use crate::error::{CliError, CliResult};
use clap::{Args, ValueEnum};
use courier_submit::{CommitmentConfig, FeeBid, SubmitOptions};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Engine settings that can come from flags or from a batch config file
#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize)]
pub struct EngineOverrides {
    /// Maximum submission attempts per transaction
    #[arg(long, global = true)]
    pub max_attempts: Option<usize>,

    /// Initial priority fee in micro-lamports per compute unit
    #[arg(long, global = true)]
    pub fee_bid: Option<u64>,

    /// Priority fee ceiling in micro-lamports per compute unit
    #[arg(long, global = true)]
    pub fee_ceiling: Option<u64>,

    /// Seconds to wait for confirmation before retrying
    #[arg(long, global = true)]
    pub confirmation_timeout_secs: Option<u64>,

    /// Commitment level a transaction must reach
    #[arg(long, global = true, value_enum)]
    pub commitment: Option<Commitment>,

    /// Compute unit limit to request
    #[arg(long, global = true)]
    pub compute_unit_limit: Option<u32>,

    /// Send without simulating first
    #[arg(long, global = true)]
    #[serde(default)]
    pub skip_simulation: bool,
}

impl EngineOverrides {
    /// Fields set here win over `fallback`
    pub fn or(&self, fallback: &EngineOverrides) -> EngineOverrides {
        EngineOverrides {
            max_attempts: self.max_attempts.or(fallback.max_attempts),
            fee_bid: self.fee_bid.or(fallback.fee_bid),
            fee_ceiling: self.fee_ceiling.or(fallback.fee_ceiling),
            confirmation_timeout_secs: self
                .confirmation_timeout_secs
                .or(fallback.confirmation_timeout_secs),
            commitment: self.commitment.or(fallback.commitment),
            compute_unit_limit: self.compute_unit_limit.or(fallback.compute_unit_limit),
            skip_simulation: self.skip_simulation || fallback.skip_simulation,
        }
    }

    pub fn submit_options(&self) -> CliResult<SubmitOptions> {
        let mut options = SubmitOptions::default();

        if let Some(max_attempts) = self.max_attempts {
            options.max_attempts = max_attempts;
        }
        if let Some(fee_bid) = self.fee_bid {
            options.initial_fee_bid = FeeBid::from_micro_lamports(fee_bid);
        }
        if let Some(fee_ceiling) = self.fee_ceiling {
            options.fee_ceiling = Some(FeeBid::from_micro_lamports(fee_ceiling));
        }
        if let Some(secs) = self.confirmation_timeout_secs {
            options.confirmation_timeout = Duration::from_secs(secs);
        }
        if let Some(commitment) = self.commitment {
            options.commitment = commitment.into();
        }
        if self.compute_unit_limit.is_some() {
            options.compute_unit_limit = self.compute_unit_limit;
        }
        if self.skip_simulation {
            options.simulate_before_send = false;
        }

        options
            .validate()
            .map_err(|e| CliError::InvalidConfig(e.to_string()))?;
        Ok(options)
    }
}

/// Batch burn configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnBatchConfig {
    /// SPL token mint to burn
    pub mint: String,

    /// Whole tokens to burn from each wallet
    pub amount: u64,

    /// Token decimals
    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Wallet file with `publicKey`/`privateKey` entries
    pub wallets_file: PathBuf,

    /// Pause between wallets in the first pass
    #[serde(default = "default_delay_between_burns_ms")]
    pub delay_between_burns_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Engine settings; command-line flags take precedence
    #[serde(default)]
    pub engine: EngineOverrides,

    /// Where `burn_results_<timestamp>.json` is written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Retry rounds over wallets whose burn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_retry_backoff")]
    pub backoff: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            delay_ms: default_retry_delay_ms(),
            backoff: default_retry_backoff(),
        }
    }
}

impl RetryConfig {
    /// Delay before each wallet of retry round `round` (1-based)
    pub fn delay_for_round(&self, round: u32) -> Duration {
        let exponent = round.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.delay_ms as f64 * self.backoff.powi(exponent);
        Duration::from_millis(millis.min(u64::MAX as f64) as u64)
    }
}

fn default_decimals() -> u8 {
    9
}

fn default_delay_between_burns_ms() -> u64 {
    10_000
}

fn default_max_rounds() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    15_000
}

fn default_retry_backoff() -> f64 {
    1.5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl BurnBatchConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: BurnBatchConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        self.mint_pubkey()?;
        if self.amount == 0 {
            return Err(CliError::InvalidConfig(
                "amount must be greater than zero".to_string(),
            ));
        }
        if !self.retry.backoff.is_finite() || self.retry.backoff < 1.0 {
            return Err(CliError::InvalidConfig(format!(
                "retry.backoff must be at least 1.0, got {}",
                self.retry.backoff
            )));
        }
        to_base_units(self.amount, self.decimals)?;
        Ok(())
    }

    pub fn mint_pubkey(&self) -> CliResult<Pubkey> {
        parse_pubkey(&self.mint)
    }

    pub fn delay_between_burns(&self) -> Duration {
        Duration::from_millis(self.delay_between_burns_ms)
    }
}

/// Wallet file: `{ "wallets": [{ "publicKey": ..., "privateKey": ... }] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFile {
    pub wallets: Vec<WalletEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntry {
    pub public_key: String,
    /// Base58-encoded 64-byte secret key
    pub private_key: String,
}

impl WalletFile {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)?;
        let file: WalletFile = serde_json::from_str(&content)?;
        if file.wallets.is_empty() {
            return Err(CliError::InvalidConfig(format!(
                "no wallets found in {}",
                path.display()
            )));
        }
        Ok(file)
    }
}

impl WalletEntry {
    /// Decode the secret key and check it belongs to `public_key`
    pub fn keypair(&self) -> CliResult<Keypair> {
        let bytes = bs58::decode(&self.private_key)
            .into_vec()
            .map_err(|e| CliError::InvalidKeypair(format!("{}: {}", self.public_key, e)))?;
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| CliError::InvalidKeypair(format!("{}: {}", self.public_key, e)))?;

        let actual = keypair.pubkey().to_string();
        if actual != self.public_key {
            return Err(CliError::WalletMismatch {
                expected: self.public_key.clone(),
                actual,
            });
        }
        Ok(keypair)
    }
}

pub fn load_keypair(path: &Path) -> CliResult<Keypair> {
    read_keypair_file(path)
        .map_err(|e| CliError::InvalidKeypair(format!("{}: {}", path.display(), e)))
}

pub fn parse_pubkey(value: &str) -> CliResult<Pubkey> {
    Pubkey::from_str(value).map_err(|_| CliError::InvalidPubkey(value.to_string()))
}

/// `amount * 10^decimals`, rejecting overflow
pub fn to_base_units(amount: u64, decimals: u8) -> CliResult<u64> {
    10u64
        .checked_pow(u32::from(decimals))
        .and_then(|scale| amount.checked_mul(scale))
        .ok_or_else(|| {
            CliError::InvalidConfig(format!(
                "{} tokens with {} decimals overflows u64",
                amount, decimals
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINT: &str = "DVWo3pDQSvu8HkBCAiaRNfbeeukGTYj8qWwCU4ZeChzZ";

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_burn_batch_config_defaults() {
        let file = write_temp(&format!(
            "mint: {}\namount: 3900000\nwallets_file: wallets.json\n",
            MINT
        ));
        let config = BurnBatchConfig::load(file.path()).unwrap();

        assert_eq!(config.decimals, 9);
        assert_eq!(config.delay_between_burns(), Duration::from_secs(10));
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.engine, EngineOverrides::default());
        assert_eq!(config.mint_pubkey().unwrap().to_string(), MINT);
    }

    #[test]
    fn test_burn_batch_config_with_engine_section() {
        let file = write_temp(&format!(
            r#"
mint: {}
amount: 5
decimals: 6
wallets_file: wallets.json
delay_between_burns_ms: 500
retry:
  max_rounds: 2
  delay_ms: 1000
  backoff: 2.0
engine:
  max_attempts: 7
  fee_bid: 25000
  commitment: finalized
"#,
            MINT
        ));
        let config = BurnBatchConfig::load(file.path()).unwrap();

        assert_eq!(config.retry.max_rounds, 2);
        let options = config.engine.submit_options().unwrap();
        assert_eq!(options.max_attempts, 7);
        assert_eq!(options.initial_fee_bid, FeeBid::from_micro_lamports(25_000));
        assert_eq!(options.commitment, CommitmentConfig::finalized());
    }

    #[test]
    fn test_burn_batch_config_rejects_bad_mint() {
        let file = write_temp("mint: not-a-key\namount: 1\nwallets_file: w.json\n");
        assert!(matches!(
            BurnBatchConfig::load(file.path()),
            Err(CliError::InvalidPubkey(_))
        ));
    }

    #[test]
    fn test_retry_delay_grows_by_backoff() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_round(1), Duration::from_millis(15_000));
        assert_eq!(retry.delay_for_round(2), Duration::from_millis(22_500));
        assert_eq!(retry.delay_for_round(3), Duration::from_millis(33_750));
    }

    #[test]
    fn test_flags_override_file_settings() {
        let flags = EngineOverrides {
            max_attempts: Some(2),
            ..Default::default()
        };
        let file = EngineOverrides {
            max_attempts: Some(9),
            fee_bid: Some(1),
            skip_simulation: true,
            ..Default::default()
        };

        let merged = flags.or(&file);
        assert_eq!(merged.max_attempts, Some(2));
        assert_eq!(merged.fee_bid, Some(1));
        assert!(merged.skip_simulation);
    }

    #[test]
    fn test_invalid_engine_settings_rejected() {
        let overrides = EngineOverrides {
            fee_bid: Some(10_000),
            fee_ceiling: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            overrides.submit_options(),
            Err(CliError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_wallet_entry_roundtrip() {
        let keypair = Keypair::new();
        let entry = WalletEntry {
            public_key: keypair.pubkey().to_string(),
            private_key: bs58::encode(keypair.to_bytes()).into_string(),
        };
        assert_eq!(entry.keypair().unwrap().pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_wallet_entry_mismatch() {
        let keypair = Keypair::new();
        let entry = WalletEntry {
            public_key: Keypair::new().pubkey().to_string(),
            private_key: bs58::encode(keypair.to_bytes()).into_string(),
        };
        assert!(matches!(
            entry.keypair(),
            Err(CliError::WalletMismatch { .. })
        ));
    }

    #[test]
    fn test_wallet_file_parsing() {
        let keypair = Keypair::new();
        let file = write_temp(&format!(
            r#"{{"wallets":[{{"publicKey":"{}","privateKey":"{}"}}]}}"#,
            keypair.pubkey(),
            bs58::encode(keypair.to_bytes()).into_string()
        ));
        let wallets = WalletFile::load(file.path()).unwrap();
        assert_eq!(wallets.wallets.len(), 1);

        let empty = write_temp(r#"{"wallets":[]}"#);
        assert!(matches!(
            WalletFile::load(empty.path()),
            Err(CliError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units(3, 9).unwrap(), 3_000_000_000);
        assert_eq!(to_base_units(7, 0).unwrap(), 7);
        assert!(to_base_units(u64::MAX, 1).is_err());
    }
}
