//! Payment services.

pub mod error;
pub mod grpc;
pub mod intents;
pub mod provisioning;
pub mod settlement;

pub use error::PaymentError;
pub use grpc::PaymentsApi;
pub use intents::{AmendOutcome, IntentHandle, IntentOrchestrator, IntentRequest};
pub use provisioning::{OnboardingLink, ProvisioningService};
pub use settlement::{CancelOutcome, CaptureSummary, CompletionParty, SettlementService};
