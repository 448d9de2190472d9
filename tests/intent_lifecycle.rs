//! Authorization lifecycle: create, re-size in place, replace, cancel.

mod common;

use common::*;

use pawbook::config::Environment;
use pawbook::interfaces::processor::IntentStatus;
use pawbook::services::{IntentRequest, PaymentError};

fn request(amount_cents: i64, base: Option<i64>) -> IntentRequest {
    IntentRequest {
        amount_cents,
        currency: "usd".to_string(),
        client_id: CLIENT.to_string(),
        contractor_id: CONTRACTOR.to_string(),
        base_service_cents: base,
    }
}

#[tokio::test]
async fn create_routes_transfer_to_contractor() {
    let h = seeded_harness(Environment::Test).await;

    let handle = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap();
    assert!(handle.client_secret.is_some());

    let intent = h.processor.intent(&handle.intent_id).await.unwrap();
    assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
    assert_eq!(intent.amount_cents, 10_000);
    // The contractor keeps the full base price.
    assert_eq!(intent.transfer_cents, Some(10_000));
    assert_eq!(intent.destination_account.as_deref(), Some(ACCOUNT));
    assert_eq!(
        intent.metadata.get("platform_fee_cents").map(String::as_str),
        Some("500")
    );
}

#[tokio::test]
async fn create_fails_for_unknown_contractor() {
    let h = harness(Environment::Test);
    seed_client(&h, CLIENT).await;

    let err = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::NotFound { kind: "contractor", .. }
    ));
}

#[tokio::test]
async fn create_fails_before_onboarding() {
    let h = harness(Environment::Test);
    seed_contractor(&h, CONTRACTOR, None).await;
    seed_client(&h, CLIENT).await;

    let err = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NoPayoutAccount(_)));
}

#[tokio::test]
async fn exhausted_transfer_rejects_without_processor_calls() {
    let h = seeded_harness(Environment::Test).await;

    // Legacy fee structure: 31 cents cannot cover the fees deducted from it.
    let err = h.orchestrator.create(request(31, None)).await.unwrap_err();
    assert!(matches!(err, PaymentError::Computation(_)));
    assert_eq!(h.processor.calls().await.total(), 0);

    // Same guard on re-size.
    let err = h.orchestrator.amend("pi_whatever", 0, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::Computation(_)));
    assert_eq!(h.processor.calls().await.total(), 0);
}

#[tokio::test]
async fn amend_before_authorization_mutates_in_place() {
    let h = seeded_harness(Environment::Test).await;
    let handle = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap();

    // Still collecting a payment method; $100 -> $150 keeps the same intent.
    let outcome = h
        .orchestrator
        .amend(&handle.intent_id, 15_000, Some(15_000))
        .await
        .unwrap();

    assert!(!outcome.replaced);
    assert_eq!(outcome.intent_id, handle.intent_id);
    let intent = h.processor.intent(&handle.intent_id).await.unwrap();
    assert_eq!(intent.amount_cents, 15_000);
    assert_eq!(intent.transfer_cents, Some(15_000));
}

#[tokio::test]
async fn amend_at_requires_confirmation_keeps_id() {
    let h = seeded_harness(Environment::Test).await;
    let handle = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap();
    h.processor
        .force_status(&handle.intent_id, IntentStatus::RequiresConfirmation)
        .await;

    let outcome = h
        .orchestrator
        .amend(&handle.intent_id, 15_000, Some(15_000))
        .await
        .unwrap();

    assert!(!outcome.replaced);
    assert_eq!(outcome.intent_id, handle.intent_id);
    assert_eq!(
        h.processor.intent(&handle.intent_id).await.unwrap().amount_cents,
        15_000
    );
}

#[tokio::test]
async fn amend_after_authorization_replaces_intent() {
    let h = seeded_harness(Environment::Test).await;
    let handle = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap();
    h.processor
        .force_status(&handle.intent_id, IntentStatus::RequiresCapture)
        .await;

    let outcome = h
        .orchestrator
        .amend(&handle.intent_id, 15_000, Some(15_000))
        .await
        .unwrap();

    assert!(outcome.replaced);
    assert_ne!(outcome.intent_id, handle.intent_id);

    // The predecessor hold is released before the successor exists.
    let old = h.processor.intent(&handle.intent_id).await.unwrap();
    assert_eq!(old.status, IntentStatus::Canceled);

    let fresh = h.processor.intent(&outcome.intent_id).await.unwrap();
    assert_eq!(fresh.amount_cents, 15_000);
    assert_eq!(fresh.destination_account.as_deref(), Some(ACCOUNT));
    assert_eq!(fresh.status, IntentStatus::RequiresPaymentMethod);
}

#[tokio::test]
async fn amend_canceled_intent_replaces_without_cancel_call() {
    let h = seeded_harness(Environment::Test).await;
    let handle = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap();
    h.processor
        .force_status(&handle.intent_id, IntentStatus::Canceled)
        .await;

    let before = h.processor.calls().await.cancel_intent;
    let outcome = h
        .orchestrator
        .amend(&handle.intent_id, 12_000, Some(12_000))
        .await
        .unwrap();

    assert!(outcome.replaced);
    assert_eq!(h.processor.calls().await.cancel_intent, before);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let h = seeded_harness(Environment::Test).await;
    let handle = h
        .orchestrator
        .create(request(10_000, Some(10_000)))
        .await
        .unwrap();

    let status = h.orchestrator.cancel(&handle.intent_id).await.unwrap();
    assert_eq!(status, IntentStatus::Canceled);

    // Second cancel is tolerated and reported as success.
    let status = h.orchestrator.cancel(&handle.intent_id).await.unwrap();
    assert_eq!(status, IntentStatus::Canceled);
}
