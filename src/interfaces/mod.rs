//! Abstract interfaces for the payment core.
//!
//! These traits define the contracts for:
//! - The payment processor (authorizations, settlements, accounts)
//! - Booking persistence (versioned documents)
//! - Profile persistence (payout-account / customer references)

pub mod bookings;
pub mod processor;
pub mod profiles;

pub use bookings::{Booking, BookingStatus, BookingStore, PaymentStatus, StorageError};
pub use processor::{
    Customer, IntentAmendment, IntentSpec, IntentStatus, PaymentIntent, PaymentProcessor,
    PayoutAccount, ProcessorError, Settlement,
};
pub use profiles::{ClientProfile, ContractorProfile, CustomerRef, PayoutAccountRef, ProfileStore};
