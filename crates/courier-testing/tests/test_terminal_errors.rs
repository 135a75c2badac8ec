use courier_submit::{AttemptOutcome, BuildError, SubmitError};
use courier_testing::{
    init_test_logging, test_options, Landing, SendScript, TestFixture, TEST_INITIAL_FEE_BID,
};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_empty_instructions_rejected() {
    init_test_logging();
    let fixture = TestFixture::new();

    let report = fixture
        .client
        .submit_with_report(&[], &fixture.payer, &test_options())
        .await;

    assert_eq!(report.result, Err(SubmitError::NoInstructions));
    assert!(report.attempts.is_empty());
    assert!(fixture.ledger.fetched_markers().is_empty());
    assert_eq!(fixture.ledger.send_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_options_rejected() {
    let fixture = TestFixture::new();
    let mut options = test_options();
    options.max_attempts = 0;

    let result = fixture
        .client
        .submit(&fixture.transfer_instructions(), &fixture.payer, &options)
        .await;

    assert!(matches!(result, Err(SubmitError::InvalidConfig(_))));
    assert!(fixture.ledger.fetched_markers().is_empty());
}

/// A payer that cannot cover the fee stops the submission on the first attempt
#[tokio::test(start_paused = true)]
async fn test_insufficient_balance_is_terminal() {
    let fixture = TestFixture::new();
    fixture.ledger.set_balance(1_000);

    let mut options = test_options();
    options.min_payer_balance = Some(100_000);

    let started = Instant::now();
    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &options)
        .await;

    match &report.result {
        Err(SubmitError::InsufficientBalance {
            required,
            available,
        }) => {
            assert_eq!(*available, 1_000);
            assert!(*required > 100_000);
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(fixture.ledger.fetched_markers().is_empty());
    assert_eq!(fixture.ledger.send_calls(), 0);
}

/// Simulation rejection is recoverable and nothing reaches the network
#[tokio::test(start_paused = true)]
async fn test_simulation_rejection_retries_without_sending() {
    let fixture = TestFixture::new();
    fixture
        .ledger
        .reject_next_simulation("InstructionError(0, Custom(1))")
        .script(SendScript::Accept(Landing::confirmed_on_poll()));

    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &test_options())
        .await;

    assert!(report.result.is_ok());
    assert_eq!(fixture.ledger.simulations(), 2);
    assert_eq!(fixture.ledger.send_calls(), 1);

    match &report.attempts[0].outcome {
        Some(AttemptOutcome::Failed(SubmitError::Build(BuildError::SimulationRejected {
            reason,
            ..
        }))) => assert!(reason.contains("Custom(1)")),
        other => panic!("expected SimulationRejected, got {:?}", other),
    }
    assert_eq!(report.attempts[0].signature, None);
    assert_eq!(
        fixture.ledger.sent()[0].fee_bid,
        Some(TEST_INITIAL_FEE_BID * 2)
    );
}

/// With simulation disabled the transaction goes straight to the node
#[tokio::test(start_paused = true)]
async fn test_simulation_can_be_skipped() {
    let fixture = TestFixture::new();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_poll()));

    let mut options = test_options();
    options.simulate_before_send = false;

    let result = fixture
        .client
        .submit(&fixture.transfer_instructions(), &fixture.payer, &options)
        .await;

    assert!(result.is_ok());
    assert_eq!(fixture.ledger.simulations(), 0);
}

/// A blockhash fetch failure is retried with a fresh fetch
#[tokio::test(start_paused = true)]
async fn test_blockhash_failure_is_recoverable() {
    let fixture = TestFixture::new();
    fixture
        .ledger
        .fail_next_blockhash(courier_submit::LedgerError::Transport(
            "connection reset".to_string(),
        ))
        .script(SendScript::Accept(Landing::confirmed_on_poll()));

    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &test_options())
        .await;

    assert!(report.result.is_ok());
    assert!(matches!(
        report.attempts[0].outcome,
        Some(AttemptOutcome::Failed(SubmitError::Build(BuildError::Blockhash(_))))
    ));
    assert_eq!(fixture.ledger.fetched_markers().len(), 1);
}
