//! Shared fixtures for the payment flow tests.
//!
//! Everything runs against the in-memory mocks; no network, no database.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use pawbook::config::Environment;
use pawbook::fees::FeeSchedule;
use pawbook::interfaces::bookings::{Booking, BookingStore};
use pawbook::interfaces::processor::PaymentProcessor;
use pawbook::interfaces::profiles::{ClientProfile, ContractorProfile, PayoutAccountRef};
use pawbook::processor::MockProcessor;
use pawbook::services::{IntentOrchestrator, ProvisioningService, SettlementService};
use pawbook::storage::{MockBookingStore, MockProfileStore};

pub const CLIENT: &str = "client-1";
pub const CONTRACTOR: &str = "contractor-1";
pub const ACCOUNT: &str = "acct_seeded";

pub struct Harness {
    pub processor: Arc<MockProcessor>,
    pub bookings: Arc<MockBookingStore>,
    pub profiles: Arc<MockProfileStore>,
    pub provisioning: Arc<ProvisioningService>,
    pub orchestrator: IntentOrchestrator,
    pub settlement: SettlementService,
}

/// Wire the services against fresh mocks in the given environment.
pub fn harness(environment: Environment) -> Harness {
    let processor = Arc::new(MockProcessor::new(environment));
    let bookings = Arc::new(MockBookingStore::new());
    let profiles = Arc::new(MockProfileStore::new());
    let fees = FeeSchedule::default();

    let provisioning = Arc::new(ProvisioningService::new(
        Arc::clone(&processor) as Arc<dyn PaymentProcessor>,
        Arc::clone(&profiles) as _,
        environment,
    ));
    let orchestrator = IntentOrchestrator::new(
        Arc::clone(&processor) as Arc<dyn PaymentProcessor>,
        Arc::clone(&bookings) as _,
        Arc::clone(&provisioning),
        fees,
    );
    let settlement = SettlementService::new(
        Arc::clone(&processor) as Arc<dyn PaymentProcessor>,
        Arc::clone(&bookings) as _,
        fees,
    );

    Harness {
        processor,
        bookings,
        profiles,
        provisioning,
        orchestrator,
        settlement,
    }
}

/// Harness with a contractor (payout account onboarded in the current
/// environment) and a client already seeded.
pub async fn seeded_harness(environment: Environment) -> Harness {
    let h = harness(environment);
    seed_contractor(&h, CONTRACTOR, Some((ACCOUNT, environment))).await;
    seed_client(&h, CLIENT).await;
    h
}

pub async fn seed_contractor(
    h: &Harness,
    id: &str,
    account: Option<(&str, Environment)>,
) {
    let payout_account = match account {
        Some((account_id, environment)) => {
            h.processor.seed_payout_account(account_id, environment).await;
            Some(PayoutAccountRef {
                account_id: account_id.to_string(),
                environment,
                created_at: Utc::now(),
            })
        }
        None => None,
    };
    h.profiles
        .seed_contractor(ContractorProfile {
            id: id.to_string(),
            email: format!("{id}@pawbook.test"),
            payout_account,
        })
        .await;
}

pub async fn seed_client(h: &Harness, id: &str) {
    h.profiles
        .seed_client(ClientProfile {
            id: id.to_string(),
            email: format!("{id}@pawbook.test"),
            customer: None,
        })
        .await;
}

/// Insert a pending booking.
pub async fn seed_booking(h: &Harness, id: &str, amount_cents: i64, base: Option<i64>) -> Booking {
    let booking = Booking::new(id, CLIENT, CONTRACTOR, amount_cents, base, "usd");
    h.bookings.insert(&booking).await.unwrap();
    booking
}

/// Attach an authorization to a stored booking, the way a request handler
/// persists the orchestrator's result.
pub async fn attach_intent(
    h: &Harness,
    booking_id: &str,
    intent_id: &str,
    platform_fee_cents: i64,
) -> Booking {
    let mut booking = h.bookings.get(booking_id).await.unwrap();
    booking.payment_intent_id = Some(intent_id.to_string());
    booking.platform_fee_cents = platform_fee_cents;
    h.bookings.update(&booking).await.unwrap()
}
