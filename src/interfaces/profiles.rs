//! Profile persistence interface.
//!
//! Only the payment-relevant slice of contractor and client profiles lives
//! here: the external payout-account / customer references and their
//! environment tags.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bookings::Result;
use crate::config::Environment;

/// A contractor's stored payout-account reference.
///
/// The environment tag records which processor mode minted the id. A tag
/// that disagrees with the running environment means the id is unusable and
/// must be replaced, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutAccountRef {
    pub account_id: String,
    pub environment: Environment,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A client's stored payment-customer reference. Same environment rules as
/// [`PayoutAccountRef`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRef {
    pub customer_id: String,
    pub environment: Environment,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Payment-relevant contractor profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractorProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub payout_account: Option<PayoutAccountRef>,
}

/// Payment-relevant client profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub customer: Option<CustomerRef>,
}

/// Interface for profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a contractor profile, `None` when absent.
    async fn contractor(&self, id: &str) -> Result<Option<ContractorProfile>>;

    /// Fetch a client profile, `None` when absent.
    async fn client(&self, id: &str) -> Result<Option<ClientProfile>>;

    /// Persist a contractor's payout-account reference.
    async fn set_payout_account(&self, contractor_id: &str, account: &PayoutAccountRef)
        -> Result<()>;

    /// Persist a client's customer reference.
    async fn set_customer(&self, client_id: &str, customer: &CustomerRef) -> Result<()>;
}
