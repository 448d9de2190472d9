//! Payment intent orchestration.
//!
//! Keeps exactly one manual-capture authorization synchronized with a
//! booking's price and contractor destination. Funds are only moved at
//! capture time (see [`crate::services::settlement`]); everything here
//! manages the hold.

use std::collections::HashMap;
use std::sync::Arc;

use backon::Retryable;
use tracing::info;

use crate::fees::{FeeQuote, FeeSchedule};
use crate::interfaces::bookings::{BookingStore, PaymentStatus};
use crate::interfaces::processor::{
    IntentAmendment, IntentSpec, IntentStatus, PaymentProcessor, ProcessorError,
};
use crate::services::error::{PaymentError, Result};
use crate::services::provisioning::ProvisioningService;
use crate::utils::retry::{conflict_backoff, is_retryable};

/// Handle to a newly created authorization.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub intent_id: String,
    pub client_secret: Option<String>,
}

/// Outcome of re-sizing an authorization.
#[derive(Debug, Clone)]
pub struct AmendOutcome {
    pub intent_id: String,
    pub client_secret: Option<String>,
    /// True when the prior authorization was canceled and replaced. The
    /// payer must provide a payment method for the replacement.
    pub replaced: bool,
}

/// Request to open an authorization.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// Gross charge to the client, cents.
    pub amount_cents: i64,
    pub currency: String,
    pub client_id: String,
    pub contractor_id: String,
    /// Contractor's nominal service price when fees are billed on top.
    pub base_service_cents: Option<i64>,
}

/// Orchestrates authorization lifecycle against the processor.
pub struct IntentOrchestrator {
    processor: Arc<dyn PaymentProcessor>,
    bookings: Arc<dyn BookingStore>,
    provisioning: Arc<ProvisioningService>,
    fees: FeeSchedule,
}

impl IntentOrchestrator {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        bookings: Arc<dyn BookingStore>,
        provisioning: Arc<ProvisioningService>,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            processor,
            bookings,
            provisioning,
            fees,
        }
    }

    /// Open a manual-capture authorization routed to the contractor's
    /// payout account.
    ///
    /// Fee math runs before anything leaves the process: a non-positive
    /// transfer rejects without a single processor call.
    pub async fn create(&self, request: IntentRequest) -> Result<IntentHandle> {
        if request.currency.trim().is_empty() {
            return Err(PaymentError::Validation("currency is required".to_string()));
        }
        if request.client_id.is_empty() || request.contractor_id.is_empty() {
            return Err(PaymentError::Validation(
                "client_id and contractor_id are required".to_string(),
            ));
        }

        let quote = self
            .fees
            .quote(request.amount_cents, request.base_service_cents)?;

        let destination = self
            .provisioning
            .payout_account_for(&request.contractor_id)
            .await?;
        let customer = self.provisioning.customer_for(&request.client_id).await?;

        let intent = self
            .processor
            .create_intent(IntentSpec {
                amount_cents: request.amount_cents,
                currency: request.currency.to_lowercase(),
                customer_id: customer,
                destination_account: destination,
                transfer_cents: quote.transfer_cents,
                metadata: fee_metadata(&quote, request.base_service_cents),
            })
            .await?;

        info!(
            intent = %intent.id,
            amount = request.amount_cents,
            transfer = quote.transfer_cents,
            "opened payment authorization"
        );

        Ok(IntentHandle {
            intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Re-size an authorization to a new amount.
    ///
    /// While the payer has not yet authorized funds the intent is mutated in
    /// place. Once funds are held, the old authorization is canceled first
    /// and a fresh one is created, so two holds never coexist.
    pub async fn amend(
        &self,
        intent_id: &str,
        new_amount_cents: i64,
        new_base_cents: Option<i64>,
    ) -> Result<AmendOutcome> {
        let quote = self.fees.quote(new_amount_cents, new_base_cents)?;

        let current = self.processor.retrieve_intent(intent_id).await?;

        if current.status.is_pre_authorization() {
            let updated = self
                .processor
                .update_intent(
                    intent_id,
                    IntentAmendment {
                        amount_cents: new_amount_cents,
                        transfer_cents: quote.transfer_cents,
                        metadata: fee_metadata(&quote, new_base_cents),
                    },
                )
                .await?;
            info!(intent = %updated.id, amount = new_amount_cents, "re-sized authorization in place");
            return Ok(AmendOutcome {
                intent_id: updated.id,
                client_secret: updated.client_secret,
                replaced: false,
            });
        }

        // Funds already authorized (or the intent is terminal): replace.
        if !matches!(
            current.status,
            IntentStatus::Canceled | IntentStatus::Succeeded
        ) {
            match self.processor.cancel_intent(intent_id).await {
                Ok(_) | Err(ProcessorError::AlreadyCanceled(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let customer = current.customer_id.ok_or_else(|| {
            PaymentError::Validation(format!("intent {intent_id} has no customer to re-authorize"))
        })?;
        let destination = current.destination_account.ok_or_else(|| {
            PaymentError::Validation(format!("intent {intent_id} has no payout destination"))
        })?;

        let fresh = self
            .processor
            .create_intent(IntentSpec {
                amount_cents: new_amount_cents,
                currency: current.currency,
                customer_id: customer,
                destination_account: destination,
                transfer_cents: quote.transfer_cents,
                metadata: fee_metadata(&quote, new_base_cents),
            })
            .await?;

        info!(
            old_intent = %intent_id,
            new_intent = %fresh.id,
            amount = new_amount_cents,
            "replaced authorization"
        );

        Ok(AmendOutcome {
            intent_id: fresh.id,
            client_secret: fresh.client_secret,
            replaced: true,
        })
    }

    /// Cancel an authorization. Canceling one that is already canceled
    /// reports success with the terminal status.
    pub async fn cancel(&self, intent_id: &str) -> Result<IntentStatus> {
        match self.processor.cancel_intent(intent_id).await {
            Ok(intent) => Ok(intent.status),
            Err(ProcessorError::AlreadyCanceled(_)) => Ok(IntentStatus::Canceled),
            Err(e) => Err(e.into()),
        }
    }

    /// Change a booking's price, keeping its authorization in sync.
    ///
    /// Reads the booking's current intent id immediately before acting and
    /// writes back under the version read, so a concurrent edit that has
    /// already replaced the intent surfaces as a conflict and the whole
    /// read-amend-persist cycle retries against fresh state. A stale intent
    /// id is never blindly canceled.
    pub async fn sync_booking_amount(
        &self,
        booking_id: &str,
        new_amount_cents: i64,
        new_base_cents: Option<i64>,
    ) -> Result<AmendOutcome> {
        (|| self.try_sync(booking_id, new_amount_cents, new_base_cents))
            .retry(conflict_backoff())
            .when(is_retryable)
            .await
    }

    async fn try_sync(
        &self,
        booking_id: &str,
        new_amount_cents: i64,
        new_base_cents: Option<i64>,
    ) -> Result<AmendOutcome> {
        let mut booking = self.bookings.get(booking_id).await?;

        if booking.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid(booking_id.to_string()));
        }
        let intent_id = booking.payment_intent_id.clone().ok_or_else(|| {
            PaymentError::Validation(format!("booking {booking_id} has no payment authorization"))
        })?;

        let outcome = self.amend(&intent_id, new_amount_cents, new_base_cents).await?;
        let quote = self.fees.quote(new_amount_cents, new_base_cents)?;

        booking.payment_amount_cents = new_amount_cents;
        booking.base_service_cents = new_base_cents;
        booking.platform_fee_cents = quote.platform_fee_cents;
        booking.payment_intent_id = Some(outcome.intent_id.clone());
        self.bookings.update(&booking).await?;

        Ok(outcome)
    }
}

fn fee_metadata(quote: &FeeQuote, base_service_cents: Option<i64>) -> HashMap<String, String> {
    let mut metadata = HashMap::from([
        (
            "platform_fee_cents".to_string(),
            quote.platform_fee_cents.to_string(),
        ),
        (
            "estimated_processor_fee_cents".to_string(),
            quote.estimated_processor_fee_cents.to_string(),
        ),
    ]);
    if let Some(base) = base_service_cents {
        metadata.insert("base_service_cents".to_string(), base.to_string());
    }
    metadata
}
