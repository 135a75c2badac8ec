use courier_submit::{AttemptOutcome, DetectionChannel, FeeBid};
use courier_testing::{
    init_test_logging, test_options, Landing, SendScript, TestFixture, TEST_INITIAL_FEE_BID,
};
use std::time::Duration;
use tokio::time::Instant;

/// A transaction visible to the first status poll is confirmed without a retry
#[tokio::test(start_paused = true)]
async fn test_confirm_on_first_poll() {
    init_test_logging();
    let fixture = TestFixture::new();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_poll()));

    let options = test_options();
    let started = Instant::now();
    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &options)
        .await;
    let elapsed = started.elapsed();

    let sent = fixture.ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(report.result, Ok(sent[0].signature));

    // One attempt, confirmed by the poll that fires after one interval
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(
        report.attempts[0].outcome,
        Some(AttemptOutcome::Confirmed {
            channel: DetectionChannel::Polling
        })
    );
    assert_eq!(report.attempts[0].signature, Some(sent[0].signature));
    assert!(elapsed >= options.poll_interval);
    assert!(elapsed < options.poll_interval + Duration::from_secs(1));

    assert_eq!(fixture.ledger.send_calls(), 1);
    assert_eq!(fixture.ledger.fetched_markers().len(), 1);
    assert_eq!(fixture.ledger.simulations(), 1);
    assert_eq!(sent[0].fee_bid, Some(TEST_INITIAL_FEE_BID));
    assert_eq!(
        report.fee_bids(),
        vec![FeeBid::from_micro_lamports(TEST_INITIAL_FEE_BID)]
    );
}

/// The listener registered for the attempt is released once it resolves
#[tokio::test(start_paused = true)]
async fn test_confirmation_releases_subscription() {
    let fixture = TestFixture::new();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_poll()));

    let signature = fixture
        .client
        .submit(&fixture.transfer_instructions(), &fixture.payer, &test_options())
        .await
        .expect("submission should confirm");

    assert_eq!(fixture.ledger.subscriptions(), 1);
    assert_eq!(fixture.ledger.active_subscriptions(), 0);
    assert!(fixture.ledger.subscription_released(&signature));
}

/// Polling alone is enough when the websocket endpoint is unavailable
#[tokio::test(start_paused = true)]
async fn test_confirm_without_subscription_endpoint() {
    let fixture = TestFixture::new();
    fixture.ledger.disable_subscriptions();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_poll_after(
            Duration::from_secs(5),
        )));

    let started = Instant::now();
    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &test_options())
        .await;

    assert!(report.result.is_ok());
    assert_eq!(report.attempts.len(), 1);
    // Polls at 2s and 4s miss, the one at 6s sees it
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(fixture.ledger.subscriptions(), 0);
}
