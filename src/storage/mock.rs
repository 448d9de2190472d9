//! Mock storage implementations for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::interfaces::bookings::{Booking, BookingStatus, BookingStore, Result, StorageError};
use crate::interfaces::profiles::{
    ClientProfile, ContractorProfile, CustomerRef, PayoutAccountRef, ProfileStore,
};

/// Mock booking store that keeps documents in memory.
#[derive(Default)]
pub struct MockBookingStore {
    bookings: RwLock<HashMap<String, Booking>>,
    /// Number of upcoming updates to reject with a version conflict, for
    /// exercising retry paths.
    injected_conflicts: RwLock<u32>,
}

impl MockBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` updates with [`StorageError::VersionConflict`].
    pub async fn inject_conflicts(&self, n: u32) {
        *self.injected_conflicts.write().await = n;
    }

    /// Direct read of the stored document, bypassing the trait.
    pub async fn stored(&self, id: &str) -> Option<Booking> {
        self.bookings.read().await.get(id).cloned()
    }
}

#[async_trait]
impl BookingStore for MockBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(StorageError::DuplicateId(booking.id.clone()));
        }
        bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Booking> {
        self.bookings
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                kind: "booking",
                id: id.to_string(),
            })
    }

    async fn update(&self, booking: &Booking) -> Result<Booking> {
        {
            let mut injected = self.injected_conflicts.write().await;
            if *injected > 0 {
                *injected -= 1;
                return Err(StorageError::VersionConflict {
                    id: booking.id.clone(),
                    attempted: booking.version,
                });
            }
        }

        let mut bookings = self.bookings.write().await;
        let stored = bookings
            .get(&booking.id)
            .ok_or_else(|| StorageError::NotFound {
                kind: "booking",
                id: booking.id.clone(),
            })?;
        if stored.version != booking.version {
            return Err(StorageError::VersionConflict {
                id: booking.id.clone(),
                attempted: booking.version,
            });
        }

        let mut next = booking.clone();
        next.version = booking.version + 1;
        next.updated_at = Utc::now();
        bookings.insert(next.id.clone(), next.clone());
        Ok(next)
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect())
    }
}

/// Mock profile store that keeps profiles in memory.
#[derive(Default)]
pub struct MockProfileStore {
    contractors: RwLock<HashMap<String, ContractorProfile>>,
    clients: RwLock<HashMap<String, ClientProfile>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_contractor(&self, profile: ContractorProfile) {
        self.contractors
            .write()
            .await
            .insert(profile.id.clone(), profile);
    }

    pub async fn seed_client(&self, profile: ClientProfile) {
        self.clients.write().await.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn contractor(&self, id: &str) -> Result<Option<ContractorProfile>> {
        Ok(self.contractors.read().await.get(id).cloned())
    }

    async fn client(&self, id: &str) -> Result<Option<ClientProfile>> {
        Ok(self.clients.read().await.get(id).cloned())
    }

    async fn set_payout_account(
        &self,
        contractor_id: &str,
        account: &PayoutAccountRef,
    ) -> Result<()> {
        let mut contractors = self.contractors.write().await;
        let profile = contractors
            .get_mut(contractor_id)
            .ok_or_else(|| StorageError::NotFound {
                kind: "contractor",
                id: contractor_id.to_string(),
            })?;
        profile.payout_account = Some(account.clone());
        Ok(())
    }

    async fn set_customer(&self, client_id: &str, customer: &CustomerRef) -> Result<()> {
        let mut clients = self.clients.write().await;
        let profile = clients
            .get_mut(client_id)
            .ok_or_else(|| StorageError::NotFound {
                kind: "client",
                id: client_id.to_string(),
            })?;
        profile.customer = Some(customer.clone());
        Ok(())
    }
}
