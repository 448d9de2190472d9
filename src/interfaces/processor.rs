//! Payment processor capability interface.
//!
//! The processor owns authorizations (payment intents), settlements, payout
//! accounts, and customer records. Everything here is remote state reached
//! over its REST API; this trait is the only seam through which the rest of
//! the crate touches it, so the whole payment flow can run against the mock
//! in [`crate::processor::mock`].

use std::collections::HashMap;

use async_trait::async_trait;

/// Result type for processor operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Errors surfaced by the payment processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The identifier was minted in the other of test/live mode. Recoverable
    /// by re-provisioning; never by retrying with the same id.
    #[error("object {id} belongs to the other processor mode (test/live)")]
    ModeMismatch { id: String },

    /// Capture attempted on an intent whose funds were already captured.
    /// A detectable outcome of racing captures, not a generic failure.
    #[error("payment intent {0} has already been captured")]
    AlreadyCaptured(String),

    /// Cancellation of an intent that is already canceled.
    #[error("payment intent {0} is already canceled")]
    AlreadyCanceled(String),

    /// The referenced object does not exist in this mode.
    #[error("no such processor object: {0}")]
    Missing(String),

    /// Any other API-level rejection, surfaced verbatim for diagnostics.
    #[error("processor API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("processor transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// External authorization status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    RequiresCapture,
    Succeeded,
    Canceled,
}

impl IntentStatus {
    /// True while the payer has not yet authorized funds; the intent can be
    /// re-sized in place without creating a replacement.
    pub fn is_pre_authorization(&self) -> bool {
        matches!(
            self,
            IntentStatus::RequiresPaymentMethod
                | IntentStatus::RequiresConfirmation
                | IntentStatus::RequiresAction
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requires_payment_method" => Some(IntentStatus::RequiresPaymentMethod),
            "requires_confirmation" => Some(IntentStatus::RequiresConfirmation),
            "requires_action" => Some(IntentStatus::RequiresAction),
            "requires_capture" => Some(IntentStatus::RequiresCapture),
            "succeeded" => Some(IntentStatus::Succeeded),
            "canceled" => Some(IntentStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A processor-side authorization, as last observed.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret the payer-side UI needs to collect a payment method.
    pub client_secret: Option<String>,
    pub status: IntentStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_id: Option<String>,
    /// Connected payout account the transfer is routed to.
    pub destination_account: Option<String>,
    /// Portion of the charge forwarded to the destination account.
    pub transfer_cents: Option<i64>,
    pub metadata: HashMap<String, String>,
}

/// Request to open a new manual-capture authorization.
#[derive(Debug, Clone)]
pub struct IntentSpec {
    pub amount_cents: i64,
    pub currency: String,
    pub customer_id: String,
    pub destination_account: String,
    pub transfer_cents: i64,
    pub metadata: HashMap<String, String>,
}

/// Re-size of an existing, not-yet-authorized intent.
#[derive(Debug, Clone)]
pub struct IntentAmendment {
    pub amount_cents: i64,
    pub transfer_cents: i64,
    pub metadata: HashMap<String, String>,
}

/// Settled charge details for a captured intent.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub charge_id: String,
    /// Actual processor fee from the balance transaction. `None` when the
    /// balance transaction has not materialized yet.
    pub processor_fee_cents: Option<i64>,
}

/// A contractor's connected payout account.
#[derive(Debug, Clone)]
pub struct PayoutAccount {
    pub id: String,
    /// Whether the contractor has finished the processor's onboarding flow.
    pub details_submitted: bool,
}

/// A client's payment customer record.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: String,
}

/// Interface to the payment processor.
///
/// Implementations:
/// - [`crate::processor::HttpProcessor`]: REST client
/// - [`crate::processor::MockProcessor`]: in-memory fake for tests
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Open a manual-capture authorization routed to a payout account.
    async fn create_intent(&self, spec: IntentSpec) -> Result<PaymentIntent>;

    /// Fetch the current state of an authorization.
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent>;

    /// Re-size a not-yet-authorized intent in place.
    async fn update_intent(&self, id: &str, amendment: IntentAmendment) -> Result<PaymentIntent>;

    /// Cancel an authorization.
    async fn cancel_intent(&self, id: &str) -> Result<PaymentIntent>;

    /// Capture the held funds of an authorization.
    async fn capture_intent(&self, id: &str) -> Result<PaymentIntent>;

    /// Fetch the settled charge for a captured intent, if one exists.
    async fn retrieve_settlement(&self, intent_id: &str) -> Result<Option<Settlement>>;

    /// Create a payout account for a contractor.
    async fn create_payout_account(&self, email: &str) -> Result<PayoutAccount>;

    /// Fetch a payout account by id.
    async fn retrieve_payout_account(&self, id: &str) -> Result<PayoutAccount>;

    /// Mint an onboarding link for a payout account.
    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String>;

    /// Create a payment customer for a client.
    async fn create_customer(&self, email: &str) -> Result<Customer>;

    /// Fetch a customer by id.
    async fn retrieve_customer(&self, id: &str) -> Result<Customer>;
}
