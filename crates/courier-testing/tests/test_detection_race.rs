use courier_submit::{
    AttemptOutcome, ConfirmationOutcome, ConfirmationTracker, DetectionChannel, Ledger,
    SendOptions, TransactionBuilder,
};
use courier_testing::{init_test_logging, test_options, Landing, SendScript, TestFixture};
use std::time::Duration;
use tokio::time::Instant;

/// Polling and subscription fire together; exactly one outcome is kept
#[tokio::test(start_paused = true)]
async fn test_both_channels_fire_single_outcome() {
    init_test_logging();
    let fixture = TestFixture::new();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_both(Duration::from_secs(2))));

    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &test_options())
        .await;

    let sent = fixture.ledger.sent();
    assert_eq!(report.result, Ok(sent[0].signature));
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(fixture.ledger.send_calls(), 1);
    match &report.attempts[0].outcome {
        Some(AttemptOutcome::Confirmed { channel }) => assert!(matches!(
            channel,
            DetectionChannel::Polling | DetectionChannel::Subscription
        )),
        other => panic!("expected Confirmed, got {:?}", other),
    }
    assert_eq!(fixture.ledger.active_subscriptions(), 0);
}

/// Once resolved, nothing from the attempt keeps running
#[tokio::test(start_paused = true)]
async fn test_tracker_settles_after_resolution() {
    let fixture = TestFixture::new();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_both(Duration::from_secs(2))));

    let options = test_options();
    let builder = TransactionBuilder::new(fixture.ledger.as_ref(), &options);
    let attempt = builder
        .build(
            &fixture.transfer_instructions(),
            &fixture.payer,
            options.initial_fee_bid,
            1,
        )
        .await
        .expect("build should succeed");
    let signature = fixture
        .ledger
        .send(
            &attempt.transaction,
            SendOptions {
                skip_preflight: true,
                preflight_commitment: options.commitment,
            },
        )
        .await
        .expect("send should be accepted");
    assert_eq!(signature, attempt.signature);

    let tracker = ConfirmationTracker::new(fixture.ledger.clone(), &options);
    let resolution = tracker.track(signature).await;
    assert_eq!(resolution.outcome, ConfirmationOutcome::Confirmed(signature));
    assert_ne!(resolution.channel, DetectionChannel::Deadline);

    let queries = fixture.ledger.status_queries();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(fixture.ledger.status_queries(), queries);
    assert!(fixture.ledger.notifications_delivered() <= 1);
    assert!(fixture.ledger.subscription_released(&signature));
}

/// A confirmation only the subscription sees still wins before the next poll
#[tokio::test(start_paused = true)]
async fn test_subscription_only_confirmation() {
    let fixture = TestFixture::new();
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_via_subscription(
            Duration::from_secs(3),
        )));

    let started = Instant::now();
    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &test_options())
        .await;

    assert!(report.result.is_ok());
    assert_eq!(
        report.attempts[0].outcome,
        Some(AttemptOutcome::Confirmed {
            channel: DetectionChannel::Subscription
        })
    );
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(fixture.ledger.notifications_delivered(), 1);
}

/// The deadline's last status check can still turn a timeout into a confirmation
#[tokio::test(start_paused = true)]
async fn test_deadline_check_finds_confirmation() {
    let fixture = TestFixture::new();
    fixture.ledger.disable_subscriptions();

    let mut options = test_options();
    // Polls at 4s and 8s miss; the status appears at 9s, the deadline is 10s
    options.poll_interval = Duration::from_secs(4);
    fixture
        .ledger
        .script(SendScript::Accept(Landing::confirmed_on_poll_after(
            Duration::from_secs(9),
        )));

    let report = fixture
        .client
        .submit_with_report(&fixture.transfer_instructions(), &fixture.payer, &options)
        .await;

    assert!(report.result.is_ok());
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(
        report.attempts[0].outcome,
        Some(AttemptOutcome::Confirmed {
            channel: DetectionChannel::Deadline
        })
    );
}
