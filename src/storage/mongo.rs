//! MongoDB implementations of the storage interfaces.

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::{Client, Collection, IndexModel};

use crate::interfaces::bookings::{Booking, BookingStatus, BookingStore, Result, StorageError};
use crate::interfaces::profiles::{
    ClientProfile, ContractorProfile, CustomerRef, PayoutAccountRef, ProfileStore,
};

/// Collection names.
const BOOKINGS_COLLECTION: &str = "bookings";
const CONTRACTORS_COLLECTION: &str = "contractors";
const CLIENTS_COLLECTION: &str = "clients";

/// True when the error is a unique-index violation.
fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we))
            if we.code == 11000
    )
}

/// MongoDB implementation of [`BookingStore`].
pub struct MongoBookingStore {
    bookings: Collection<Booking>,
}

impl MongoBookingStore {
    /// Create a new MongoDB booking store.
    pub async fn new(client: &Client, database_name: &str) -> Result<Self> {
        let database = client.database(database_name);
        let bookings = database.collection(BOOKINGS_COLLECTION);

        let store = Self { bookings };
        store.init().await?;

        Ok(store)
    }

    /// Initialize indexes for the common list queries.
    async fn init(&self) -> Result<()> {
        let status_index = IndexModel::builder().keys(doc! { "status": 1 }).build();
        self.bookings.create_index(status_index).await?;

        let party_index = IndexModel::builder()
            .keys(doc! { "client_id": 1, "contractor_id": 1 })
            .build();
        self.bookings.create_index(party_index).await?;

        Ok(())
    }
}

#[async_trait]
impl BookingStore for MongoBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        self.bookings.insert_one(booking).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StorageError::DuplicateId(booking.id.clone())
            } else {
                StorageError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Booking> {
        self.bookings
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| StorageError::NotFound {
                kind: "booking",
                id: id.to_string(),
            })
    }

    async fn update(&self, booking: &Booking) -> Result<Booking> {
        let mut next = booking.clone();
        next.version = booking.version + 1;
        next.updated_at = Utc::now();

        // Conditional on the version the caller read; a concurrent writer
        // leaves nothing to match.
        let filter = doc! { "_id": &booking.id, "version": booking.version };
        let previous = self.bookings.find_one_and_replace(filter, &next).await?;

        match previous {
            Some(_) => Ok(next),
            None => {
                let exists = self.bookings.find_one(doc! { "_id": &booking.id }).await?;
                if exists.is_some() {
                    Err(StorageError::VersionConflict {
                        id: booking.id.clone(),
                        attempted: booking.version,
                    })
                } else {
                    Err(StorageError::NotFound {
                        kind: "booking",
                        id: booking.id.clone(),
                    })
                }
            }
        }
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        let mut cursor = self.bookings.find(doc! { "status": status.as_str() }).await?;
        let mut bookings = Vec::new();
        while cursor.advance().await? {
            bookings.push(cursor.deserialize_current()?);
        }
        Ok(bookings)
    }
}

/// MongoDB implementation of [`ProfileStore`].
pub struct MongoProfileStore {
    contractors: Collection<ContractorProfile>,
    clients: Collection<ClientProfile>,
}

impl MongoProfileStore {
    pub async fn new(client: &Client, database_name: &str) -> Self {
        let database = client.database(database_name);
        Self {
            contractors: database.collection(CONTRACTORS_COLLECTION),
            clients: database.collection(CLIENTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ProfileStore for MongoProfileStore {
    async fn contractor(&self, id: &str) -> Result<Option<ContractorProfile>> {
        Ok(self.contractors.find_one(doc! { "_id": id }).await?)
    }

    async fn client(&self, id: &str) -> Result<Option<ClientProfile>> {
        Ok(self.clients.find_one(doc! { "_id": id }).await?)
    }

    async fn set_payout_account(
        &self,
        contractor_id: &str,
        account: &PayoutAccountRef,
    ) -> Result<()> {
        let value = mongodb::bson::to_bson(account)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        let result = self
            .contractors
            .update_one(
                doc! { "_id": contractor_id },
                doc! { "$set": { "payout_account": value } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StorageError::NotFound {
                kind: "contractor",
                id: contractor_id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_customer(&self, client_id: &str, customer: &CustomerRef) -> Result<()> {
        let value = mongodb::bson::to_bson(customer)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        let result = self
            .clients
            .update_one(
                doc! { "_id": client_id },
                doc! { "$set": { "customer": value } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StorageError::NotFound {
                kind: "client",
                id: client_id.to_string(),
            });
        }
        Ok(())
    }
}
