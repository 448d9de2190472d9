//! Storage implementations.

pub mod mock;
pub mod mongo;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::interfaces::bookings::{BookingStore, Result, StorageError};
use crate::interfaces::profiles::ProfileStore;

pub use mock::{MockBookingStore, MockProfileStore};
pub use mongo::{MongoBookingStore, MongoProfileStore};

/// Connect to MongoDB and build the booking and profile stores.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<(Arc<dyn BookingStore>, Arc<dyn ProfileStore>)> {
    let client = mongodb::Client::with_uri_str(&config.uri)
        .await
        .map_err(StorageError::Database)?;

    let bookings = MongoBookingStore::new(&client, &config.database).await?;
    let profiles = MongoProfileStore::new(&client, &config.database).await;

    Ok((Arc::new(bookings), Arc::new(profiles)))
}
