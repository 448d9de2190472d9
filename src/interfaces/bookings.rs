//! Booking persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The document changed between read and write. Retry against a fresh
    /// read.
    #[error("version conflict on {id}: wrote against version {attempted}")]
    VersionConflict { id: String, attempted: i64 },

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Booking lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One engagement between a client and a contractor.
///
/// Amounts are cents. `payment_status` reaches `Paid` only through a
/// successful capture, and `net_payout_cents` is always derived from the
/// settled processor fee, never the pre-capture estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub client_id: String,
    pub contractor_id: String,

    /// Gross charge to the client.
    pub payment_amount_cents: i64,
    /// Contractor's nominal service price under the fees-on-top structure.
    /// `None` on legacy bookings whose total has fees deducted.
    pub base_service_cents: Option<i64>,
    /// Platform commission, fixed when the authorization is sized.
    pub platform_fee_cents: i64,
    /// Actual processor fee, known once the charge settles.
    pub processor_fee_cents: Option<i64>,
    /// Final contractor payout bookkeeping, set at capture.
    pub net_payout_cents: Option<i64>,
    pub currency: String,

    pub payment_intent_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,

    pub client_completed: bool,
    pub contractor_completed: bool,

    /// Optimistic-lock version; bumped on every write.
    pub version: i64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A new booking awaiting payment, at version zero.
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        contractor_id: impl Into<String>,
        payment_amount_cents: i64,
        base_service_cents: Option<i64>,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            client_id: client_id.into(),
            contractor_id: contractor_id.into(),
            payment_amount_cents,
            base_service_cents,
            platform_fee_cents: 0,
            processor_fee_cents: None,
            net_payout_cents: None,
            currency: currency.into(),
            payment_intent_id: None,
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Pending,
            client_completed: false,
            contractor_completed: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Interface for booking persistence.
///
/// `update` is conditional on the version the caller read; a concurrent
/// writer surfaces as [`StorageError::VersionConflict`].
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a new booking.
    async fn insert(&self, booking: &Booking) -> Result<()>;

    /// Fetch a booking by id.
    async fn get(&self, id: &str) -> Result<Booking>;

    /// Write back a booking read earlier, guarded by its version. Returns
    /// the stored document with the bumped version.
    async fn update(&self, booking: &Booking) -> Result<Booking>;

    /// List bookings in a given lifecycle state.
    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>>;
}
