use crate::{
    fee::{FeeBid, DEFAULT_COMPUTE_UNIT_LIMIT, LAMPORTS_PER_SIGNATURE},
    ledger::{Ledger, RecencyMarker},
    BuildError, SubmitError, SubmitOptions, SubmitResult,
};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    message::Message,
    signature::Signature,
    signer::Signer,
    transaction::Transaction,
};
use tracing::{debug, warn};

/// A signed transaction prepared for one attempt
///
/// Never reused: the next attempt always builds a new one around a fresh
/// blockhash.
#[derive(Debug, Clone)]
pub struct TransactionAttempt {
    pub attempt_number: usize,
    pub fee_bid: FeeBid,
    pub recency: RecencyMarker,
    pub transaction: Transaction,
    pub signature: Signature,
}

/// Builds fee-bid, freshly-blockhashed and signed transactions
pub struct TransactionBuilder<'a> {
    ledger: &'a dyn Ledger,
    options: &'a SubmitOptions,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(ledger: &'a dyn Ledger, options: &'a SubmitOptions) -> Self {
        Self { ledger, options }
    }

    /// Fee-bid instructions followed by the caller's instructions
    pub fn with_fee_instructions(
        &self,
        instructions: &[Instruction],
        fee_bid: FeeBid,
    ) -> Vec<Instruction> {
        let mut all = Vec::with_capacity(instructions.len() + 2);
        if let Some(limit) = self.options.compute_unit_limit {
            all.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
        }
        all.push(ComputeBudgetInstruction::set_compute_unit_price(
            fee_bid.micro_lamports(),
        ));
        all.extend_from_slice(instructions);
        all
    }

    /// Build, sign and optionally simulate the transaction for one attempt
    pub async fn build(
        &self,
        instructions: &[Instruction],
        signer: &dyn Signer,
        fee_bid: FeeBid,
        attempt_number: usize,
    ) -> SubmitResult<TransactionAttempt> {
        let payer = signer.pubkey();

        if let Some(min_balance) = self.options.min_payer_balance {
            self.verify_payer_balance(signer, fee_bid, min_balance).await?;
        }

        let recency = self
            .ledger
            .latest_blockhash(self.options.commitment)
            .await
            .map_err(BuildError::Blockhash)?;

        let message = Message::new_with_blockhash(
            &self.with_fee_instructions(instructions, fee_bid),
            Some(&payer),
            &recency.blockhash,
        );

        let mut transaction = Transaction::new_unsigned(message);
        transaction
            .try_sign(&[signer], recency.blockhash)
            .map_err(|e| SubmitError::Signing(e.to_string()))?;

        let signature = transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| SubmitError::Signing("transaction has no signatures".to_string()))?;

        debug!(
            attempt = attempt_number,
            blockhash = %recency.blockhash,
            last_valid_block_height = recency.last_valid_block_height,
            %signature,
            "Built transaction"
        );

        if self.options.simulate_before_send {
            let report = self
                .ledger
                .simulate(&transaction, self.options.commitment)
                .await
                .map_err(BuildError::Simulation)?;

            if let Some(reason) = report.err {
                warn!(
                    attempt = attempt_number,
                    %reason,
                    "Simulation rejected transaction, not sending"
                );
                return Err(BuildError::SimulationRejected {
                    reason,
                    logs: report.logs,
                }
                .into());
            }

            debug!(
                attempt = attempt_number,
                units_consumed = report.units_consumed.unwrap_or(0),
                "Simulation passed"
            );
        }

        Ok(TransactionAttempt {
            attempt_number,
            fee_bid,
            recency,
            transaction,
            signature,
        })
    }

    async fn verify_payer_balance(
        &self,
        signer: &dyn Signer,
        fee_bid: FeeBid,
        min_balance: u64,
    ) -> SubmitResult<()> {
        let compute_unit_limit = self
            .options
            .compute_unit_limit
            .unwrap_or(DEFAULT_COMPUTE_UNIT_LIMIT);
        let required = min_balance
            .saturating_add(LAMPORTS_PER_SIGNATURE)
            .saturating_add(fee_bid.priority_fee_lamports(compute_unit_limit));

        let available = self
            .ledger
            .get_balance(&signer.pubkey())
            .await
            .map_err(BuildError::Balance)?;

        if available < required {
            return Err(SubmitError::InsufficientBalance {
                required,
                available,
            });
        }

        debug!(
            "Balance check passed: {} lamports available, {} required",
            available, required
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{pubkey::Pubkey, signature::Keypair, system_instruction};

    struct NoLedger;

    #[async_trait::async_trait]
    impl Ledger for NoLedger {
        async fn latest_blockhash(
            &self,
            _commitment: solana_sdk::commitment_config::CommitmentConfig,
        ) -> crate::LedgerResult<RecencyMarker> {
            Err(crate::LedgerError::Transport("offline".into()))
        }

        async fn simulate(
            &self,
            _transaction: &Transaction,
            _commitment: solana_sdk::commitment_config::CommitmentConfig,
        ) -> crate::LedgerResult<crate::SimulationReport> {
            unreachable!()
        }

        async fn send(
            &self,
            _transaction: &Transaction,
            _options: crate::SendOptions,
        ) -> crate::LedgerResult<Signature> {
            unreachable!()
        }

        async fn signature_status(
            &self,
            _signature: &Signature,
            _commitment: solana_sdk::commitment_config::CommitmentConfig,
        ) -> crate::LedgerResult<Option<crate::SignatureState>> {
            unreachable!()
        }

        async fn subscribe_signature(
            &self,
            _signature: &Signature,
            _commitment: solana_sdk::commitment_config::CommitmentConfig,
        ) -> crate::LedgerResult<crate::SignatureSubscription> {
            unreachable!()
        }

        async fn get_balance(&self, _pubkey: &Pubkey) -> crate::LedgerResult<u64> {
            Ok(1)
        }
    }

    fn transfer(payer: &Keypair) -> Vec<Instruction> {
        vec![system_instruction::transfer(
            &payer.pubkey(),
            &Pubkey::new_unique(),
            1_000,
        )]
    }

    #[test]
    fn test_fee_instructions_are_prepended() {
        let options = SubmitOptions {
            compute_unit_limit: Some(50_000),
            ..Default::default()
        };
        let builder = TransactionBuilder::new(&NoLedger, &options);
        let payer = Keypair::new();
        let base = transfer(&payer);

        let all = builder.with_fee_instructions(&base, FeeBid::from_micro_lamports(7));
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], ComputeBudgetInstruction::set_compute_unit_limit(50_000));
        assert_eq!(all[1], ComputeBudgetInstruction::set_compute_unit_price(7));
        assert_eq!(all[2], base[0]);
    }

    #[test]
    fn test_no_limit_instruction_by_default() {
        let options = SubmitOptions::default();
        let builder = TransactionBuilder::new(&NoLedger, &options);
        let payer = Keypair::new();

        let all = builder.with_fee_instructions(&transfer(&payer), FeeBid::from_micro_lamports(1));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], ComputeBudgetInstruction::set_compute_unit_price(1));
    }

    #[tokio::test]
    async fn test_blockhash_failure_is_build_error() {
        let options = SubmitOptions::default();
        let builder = TransactionBuilder::new(&NoLedger, &options);
        let payer = Keypair::new();

        let result = builder
            .build(&transfer(&payer), &payer, FeeBid::default(), 1)
            .await;
        assert!(matches!(
            result,
            Err(SubmitError::Build(BuildError::Blockhash(_)))
        ));
    }

    #[tokio::test]
    async fn test_insufficient_balance_is_terminal() {
        let options = SubmitOptions {
            min_payer_balance: Some(1_000_000),
            ..Default::default()
        };
        let builder = TransactionBuilder::new(&NoLedger, &options);
        let payer = Keypair::new();

        let err = builder
            .build(&transfer(&payer), &payer, FeeBid::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::InsufficientBalance { available: 1, .. }
        ));
        assert!(!err.is_recoverable());
    }
}
