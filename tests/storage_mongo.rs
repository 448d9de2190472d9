//! MongoDB storage integration tests.
//!
//! Run with: MONGO_URI=mongodb://localhost:27017 cargo test --test storage_mongo
//!
//! Skips itself when MONGO_URI is unset, so the suite passes without a
//! database.

use pawbook::interfaces::bookings::{Booking, BookingStatus, BookingStore, StorageError};
use pawbook::interfaces::profiles::{ContractorProfile, PayoutAccountRef, ProfileStore};
use pawbook::storage::{MongoBookingStore, MongoProfileStore};

async fn connect() -> Option<(mongodb::Client, String)> {
    let Ok(uri) = std::env::var("MONGO_URI") else {
        eprintln!("MONGO_URI not set, skipping MongoDB storage test");
        return None;
    };
    let client = mongodb::Client::with_uri_str(&uri)
        .await
        .expect("Failed to connect to MongoDB");
    let database = format!("pawbook_test_{}", uuid::Uuid::new_v4().simple());
    Some((client, database))
}

#[tokio::test]
async fn booking_round_trip_and_version_guard() {
    let Some((client, database)) = connect().await else {
        return;
    };
    let store = MongoBookingStore::new(&client, &database).await.unwrap();

    let booking = Booking::new("b1", "c1", "k1", 10_000, Some(10_000), "usd");
    store.insert(&booking).await.unwrap();

    // Duplicate ids are rejected.
    assert!(matches!(
        store.insert(&booking).await,
        Err(StorageError::DuplicateId(_))
    ));

    let mut loaded = store.get("b1").await.unwrap();
    assert_eq!(loaded.payment_amount_cents, 10_000);
    assert_eq!(loaded.version, 0);

    loaded.payment_amount_cents = 15_000;
    let updated = store.update(&loaded).await.unwrap();
    assert_eq!(updated.version, 1);

    // Writing against the version we no longer hold conflicts.
    let err = store.update(&loaded).await.unwrap_err();
    assert!(matches!(err, StorageError::VersionConflict { .. }));

    let listed = store.list_by_status(BookingStatus::Pending).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].payment_amount_cents, 15_000);

    client.database(&database).drop().await.ok();
}

#[tokio::test]
async fn profile_payment_fields_round_trip() {
    let Some((client, database)) = connect().await else {
        return;
    };
    let store = MongoProfileStore::new(&client, &database).await;

    // set on a missing profile is NotFound, not an upsert.
    let reference = PayoutAccountRef {
        account_id: "acct_1".to_string(),
        environment: pawbook::config::Environment::Test,
        created_at: chrono::Utc::now(),
    };
    assert!(matches!(
        store.set_payout_account("k1", &reference).await,
        Err(StorageError::NotFound { .. })
    ));

    client
        .database(&database)
        .collection("contractors")
        .insert_one(ContractorProfile {
            id: "k1".to_string(),
            email: "k1@pawbook.test".to_string(),
            payout_account: None,
        })
        .await
        .unwrap();

    store.set_payout_account("k1", &reference).await.unwrap();
    let profile = store.contractor("k1").await.unwrap().unwrap();
    assert_eq!(profile.payout_account.unwrap().account_id, "acct_1");

    client.database(&database).drop().await.ok();
}
