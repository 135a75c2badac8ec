use crate::{
    builder::{TransactionAttempt, TransactionBuilder},
    channel::SubmissionChannel,
    fee::FeeBid,
    ledger::{Ledger, SendOptions, SignatureState},
    tracker::{ConfirmationOutcome, ConfirmationTracker, DetectionChannel},
    SubmitError, SubmitOptions, SubmitResult,
};
use backoff::backoff::Backoff;
use solana_sdk::{
    hash::Hash, instruction::Instruction, pubkey::Pubkey, signature::Signature, signer::Signer,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// What happened to a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Confirmed { channel: DetectionChannel },
    Failed(SubmitError),
    /// A later attempt's reconciliation found this attempt's signature landed
    Reconciled(Signature),
}

/// Audit record of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt_number: usize,
    pub fee_bid: FeeBid,
    pub blockhash: Option<Hash>,
    pub last_valid_block_height: Option<u64>,
    pub signature: Option<Signature>,
    pub outcome: Option<AttemptOutcome>,
    pub backoff: Option<Duration>,
}

impl AttemptRecord {
    fn new(attempt_number: usize, fee_bid: FeeBid) -> Self {
        Self {
            attempt_number,
            fee_bid,
            blockhash: None,
            last_valid_block_height: None,
            signature: None,
            outcome: None,
            backoff: None,
        }
    }

    fn record_build(&mut self, attempt: &TransactionAttempt) {
        self.blockhash = Some(attempt.recency.blockhash);
        self.last_valid_block_height = Some(attempt.recency.last_valid_block_height);
    }
}

/// The verdict of one logical submission together with every attempt made
#[derive(Debug)]
pub struct SubmissionReport {
    pub result: SubmitResult<Signature>,
    pub attempts: Vec<AttemptRecord>,
}

impl SubmissionReport {
    pub fn fee_bids(&self) -> Vec<FeeBid> {
        self.attempts.iter().map(|a| a.fee_bid).collect()
    }
}

/// Resilient submission client
///
/// `submit` returns either a signature that reached the requested commitment
/// or an error; it never reports success it has not observed.
///
/// Resubmission is not idempotent at the ledger level. Each retry builds a new
/// transaction with a new blockhash, so if an earlier attempt lands after the
/// engine gave up on it, both may execute. The engine checks every earlier
/// signature before it fails a send, before it returns a terminal error and
/// once more before declaring the submission exhausted. That narrows the
/// window but cannot close it.
pub struct SubmitClient {
    ledger: Arc<dyn Ledger>,
}

impl SubmitClient {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub async fn get_balance(&self, pubkey: &Pubkey) -> SubmitResult<u64> {
        self.ledger.get_balance(pubkey).await.map_err(SubmitError::from)
    }

    /// Submit `instructions` signed by `signer` and wait for confirmation
    pub async fn submit(
        &self,
        instructions: &[Instruction],
        signer: &dyn Signer,
        options: &SubmitOptions,
    ) -> SubmitResult<Signature> {
        self.submit_with_report(instructions, signer, options)
            .await
            .result
    }

    /// Same as [`SubmitClient::submit`], keeping a record of every attempt
    pub async fn submit_with_report(
        &self,
        instructions: &[Instruction],
        signer: &dyn Signer,
        options: &SubmitOptions,
    ) -> SubmissionReport {
        let mut attempts = Vec::new();
        let result = self
            .run(instructions, signer, options, &mut attempts)
            .await;

        match &result {
            Ok(signature) => info!(
                %signature,
                attempts = attempts.len(),
                "Submission confirmed"
            ),
            Err(err) => error!(
                error = %err,
                attempts = attempts.len(),
                "Submission failed"
            ),
        }

        SubmissionReport { result, attempts }
    }

    async fn run(
        &self,
        instructions: &[Instruction],
        signer: &dyn Signer,
        options: &SubmitOptions,
        records: &mut Vec<AttemptRecord>,
    ) -> SubmitResult<Signature> {
        if instructions.is_empty() {
            return Err(SubmitError::NoInstructions);
        }
        options.validate()?;

        let policy = options.fee_policy();
        let mut backoff = options.retry_backoff.clone();
        backoff.reset();

        let builder = TransactionBuilder::new(self.ledger.as_ref(), options);
        let channel = SubmissionChannel::new(
            self.ledger.as_ref(),
            SendOptions {
                skip_preflight: options.simulate_before_send,
                preflight_commitment: options.commitment,
            },
        );
        let tracker = ConfirmationTracker::new(self.ledger.clone(), options);

        let mut prior_signatures: Vec<Signature> = Vec::new();
        let mut fee_bid = policy.first();

        for attempt_number in 1..=options.max_attempts {
            info!(
                attempt = attempt_number,
                max_attempts = options.max_attempts,
                fee_bid = fee_bid.micro_lamports(),
                payer = %signer.pubkey(),
                "Starting submission attempt"
            );

            let mut record = AttemptRecord::new(attempt_number, fee_bid);
            let result = self
                .run_attempt(
                    &builder,
                    &channel,
                    &tracker,
                    instructions,
                    signer,
                    fee_bid,
                    &mut record,
                    &mut prior_signatures,
                )
                .await;

            let err = match result {
                Ok(signature) => {
                    records.push(record);
                    return Ok(signature);
                }
                Err(err) => err,
            };

            // Built but never accepted by the node
            let send_failed = record.blockhash.is_some() && record.signature.is_none();
            let last_attempt = attempt_number == options.max_attempts;

            record.outcome = Some(AttemptOutcome::Failed(err.clone()));
            records.push(record);

            // An earlier signature may have landed after its own deadline
            if send_failed || !err.is_recoverable() || last_attempt {
                if let Some(signature) = self
                    .reconcile_records(&prior_signatures, records, options)
                    .await
                {
                    return Ok(signature);
                }
            }

            if !err.is_recoverable() {
                return Err(err);
            }

            if last_attempt {
                return Err(SubmitError::Exhausted {
                    attempts: attempt_number,
                    last: Box::new(err),
                });
            }

            let (delay, next_fee_bid) = if err.is_rate_limited() {
                (options.rate_limit_backoff, fee_bid)
            } else {
                let delay = backoff
                    .next_backoff()
                    .unwrap_or(options.retry_backoff.max_interval);
                (delay, policy.escalate(fee_bid))
            };

            warn!(
                attempt = attempt_number,
                error = %err,
                rate_limited = err.is_rate_limited(),
                delay_ms = delay.as_millis() as u64,
                next_fee_bid = next_fee_bid.micro_lamports(),
                "Attempt failed, retrying"
            );

            if let Some(record) = records.last_mut() {
                record.backoff = Some(delay);
            }

            tokio::time::sleep(delay).await;
            fee_bid = next_fee_bid;
        }

        // validate() guarantees at least one attempt ran
        Err(SubmitError::InvalidConfig(
            "max_attempts must be at least 1".to_string(),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_attempt(
        &self,
        builder: &TransactionBuilder<'_>,
        channel: &SubmissionChannel<'_>,
        tracker: &ConfirmationTracker,
        instructions: &[Instruction],
        signer: &dyn Signer,
        fee_bid: FeeBid,
        record: &mut AttemptRecord,
        prior_signatures: &mut Vec<Signature>,
    ) -> SubmitResult<Signature> {
        let attempt = builder
            .build(instructions, signer, fee_bid, record.attempt_number)
            .await?;
        record.record_build(&attempt);

        let signature = channel.send(&attempt).await?;

        record.signature = Some(signature);
        prior_signatures.push(signature);

        let resolution = tracker.track(signature).await;
        match resolution.outcome {
            ConfirmationOutcome::Confirmed(signature) => {
                record.outcome = Some(AttemptOutcome::Confirmed {
                    channel: resolution.channel,
                });
                Ok(signature)
            }
            ConfirmationOutcome::OnChainFailure { signature, reason } => {
                Err(SubmitError::OnChainFailure { signature, reason })
            }
            ConfirmationOutcome::Timeout(signature) => {
                Err(SubmitError::ConfirmationTimeout(signature))
            }
        }
    }

    /// Reconcile earlier signatures and mark the attempt that landed
    async fn reconcile_records(
        &self,
        signatures: &[Signature],
        records: &mut [AttemptRecord],
        options: &SubmitOptions,
    ) -> Option<Signature> {
        let signature = self.reconcile(signatures, options).await?;
        if let Some(landed) = records
            .iter_mut()
            .find(|r| r.signature == Some(signature))
        {
            landed.outcome = Some(AttemptOutcome::Reconciled(signature));
        }
        Some(signature)
    }

    /// First earlier signature that reached the commitment, if any
    async fn reconcile(
        &self,
        signatures: &[Signature],
        options: &SubmitOptions,
    ) -> Option<Signature> {
        for signature in signatures {
            match self
                .ledger
                .signature_status(signature, options.commitment)
                .await
            {
                Ok(Some(SignatureState::Succeeded)) => {
                    info!(%signature, "Reconciliation found an earlier attempt confirmed");
                    return Some(*signature);
                }
                Ok(Some(SignatureState::Failed(reason))) => {
                    debug!(%signature, %reason, "Earlier attempt failed on-chain");
                }
                Ok(None) => debug!(%signature, "Earlier attempt not found"),
                Err(err) => warn!(%signature, error = %err, "Reconciliation status check failed"),
            }
        }
        None
    }
}
