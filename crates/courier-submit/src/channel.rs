use crate::{
    builder::TransactionAttempt,
    ledger::{Ledger, SendOptions},
    SubmitError, SubmitResult,
};
use solana_sdk::signature::Signature;
use tracing::{info, warn};

/// Sends a built transaction exactly once
pub struct SubmissionChannel<'a> {
    ledger: &'a dyn Ledger,
    send_options: SendOptions,
}

impl<'a> SubmissionChannel<'a> {
    pub fn new(ledger: &'a dyn Ledger, send_options: SendOptions) -> Self {
        Self {
            ledger,
            send_options,
        }
    }

    pub async fn send(&self, attempt: &TransactionAttempt) -> SubmitResult<Signature> {
        match self.ledger.send(&attempt.transaction, self.send_options).await {
            Ok(signature) => {
                if signature != attempt.signature {
                    warn!(
                        attempt = attempt.attempt_number,
                        expected = %attempt.signature,
                        returned = %signature,
                        "RPC returned an unexpected signature"
                    );
                }
                info!(
                    attempt = attempt.attempt_number,
                    fee_bid = attempt.fee_bid.micro_lamports(),
                    %signature,
                    "Transaction sent"
                );
                Ok(signature)
            }
            Err(err) => {
                let err = SubmitError::from(err);
                warn!(
                    attempt = attempt.attempt_number,
                    fee_bid = attempt.fee_bid.micro_lamports(),
                    error = %err,
                    "Transaction send failed"
                );
                Err(err)
            }
        }
    }
}
