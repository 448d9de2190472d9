//! Completion tracking, capture, and payout reconciliation.
//!
//! A booking's funds move exactly once: after both the client and the
//! contractor have confirmed completion, the held authorization is captured,
//! the settled charge's actual processor fee replaces the pre-capture
//! estimate, and the final payout bookkeeping lands on the booking in a
//! single update. A capture failure leaves the booking untouched and
//! retryable.

use std::sync::Arc;

use backon::Retryable;
use tracing::{info, warn};

use crate::fees::FeeSchedule;
use crate::interfaces::bookings::{Booking, BookingStatus, BookingStore, PaymentStatus};
use crate::interfaces::processor::{IntentStatus, PaymentProcessor, ProcessorError};
use crate::services::error::{PaymentError, Result};
use crate::utils::retry::{conflict_backoff, is_retryable};

/// Which side of the engagement is confirming completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionParty {
    Client,
    Contractor,
}

/// Final financials of a captured booking.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSummary {
    /// Gross charge to the client, cents.
    pub total_cents: i64,
    pub platform_fee_cents: i64,
    /// Actual settled processor fee (or the estimate when the settlement
    /// had no fee yet).
    pub processor_fee_cents: i64,
    pub net_payout_cents: i64,
}

/// Outcome of canceling a booking.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub status: BookingStatus,
    /// Set when cancellation succeeded but an auxiliary step was a no-op,
    /// e.g. the authorization was already gone.
    pub warning: Option<String>,
}

/// Drives bookings from dual confirmation to paid-out.
pub struct SettlementService {
    processor: Arc<dyn PaymentProcessor>,
    bookings: Arc<dyn BookingStore>,
    fees: FeeSchedule,
}

impl SettlementService {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        bookings: Arc<dyn BookingStore>,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            processor,
            bookings,
            fees,
        }
    }

    /// Record one party's completion confirmation. Idempotent per party.
    pub async fn record_completion(
        &self,
        booking_id: &str,
        party: CompletionParty,
    ) -> Result<Booking> {
        (|| async {
            let mut booking = self.bookings.get(booking_id).await?;
            if booking.status == BookingStatus::Cancelled {
                return Err(PaymentError::Validation(format!(
                    "booking {booking_id} is cancelled"
                )));
            }

            let already = match party {
                CompletionParty::Client => booking.client_completed,
                CompletionParty::Contractor => booking.contractor_completed,
            };
            if already {
                return Ok(booking);
            }

            match party {
                CompletionParty::Client => booking.client_completed = true,
                CompletionParty::Contractor => booking.contractor_completed = true,
            }
            Ok(self.bookings.update(&booking).await?)
        })
        .retry(conflict_backoff())
        .when(is_retryable)
        .await
    }

    /// Capture the held funds and finalize the payout.
    ///
    /// Requires both completion flags, a not-yet-paid booking, and an
    /// authorization in `requires_capture`. Nothing is persisted until the
    /// processor has confirmed the capture.
    pub async fn capture(&self, booking_id: &str) -> Result<CaptureSummary> {
        let booking = self.bookings.get(booking_id).await?;

        if booking.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid(booking_id.to_string()));
        }
        if !(booking.client_completed && booking.contractor_completed) {
            return Err(PaymentError::NotReady {
                detail: "both parties must confirm completion".to_string(),
            });
        }
        let intent_id = booking.payment_intent_id.clone().ok_or_else(|| {
            PaymentError::NotReady {
                detail: "booking has no payment authorization".to_string(),
            }
        })?;

        let intent = self.processor.retrieve_intent(&intent_id).await?;
        if intent.status != IntentStatus::RequiresCapture {
            return Err(PaymentError::NotReady {
                detail: format!("authorization status is {}", intent.status),
            });
        }

        match self.processor.capture_intent(&intent_id).await {
            Ok(_) => {}
            // A racing capture won; the booking record will say so shortly.
            Err(ProcessorError::AlreadyCaptured(_)) => {
                return Err(PaymentError::AlreadyPaid(booking_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let processor_fee_cents = self.settled_fee(&intent_id, &booking).await;
        let net_payout_cents =
            booking.payment_amount_cents - booking.platform_fee_cents - processor_fee_cents;

        // The capture happened; persistence must converge even against
        // concurrent writers.
        let persisted = (|| async {
            let mut fresh = self.bookings.get(booking_id).await?;
            if fresh.payment_status == PaymentStatus::Paid {
                return Ok(fresh);
            }
            fresh.payment_status = PaymentStatus::Paid;
            fresh.status = BookingStatus::Completed;
            fresh.processor_fee_cents = Some(processor_fee_cents);
            fresh.net_payout_cents = Some(net_payout_cents);
            Ok(self.bookings.update(&fresh).await?)
        })
        .retry(conflict_backoff())
        .when(is_retryable)
        .await?;

        info!(
            booking = %booking_id,
            intent = %intent_id,
            total = persisted.payment_amount_cents,
            platform_fee = persisted.platform_fee_cents,
            processor_fee = processor_fee_cents,
            net_payout = net_payout_cents,
            "captured booking payment"
        );

        Ok(CaptureSummary {
            total_cents: persisted.payment_amount_cents,
            platform_fee_cents: persisted.platform_fee_cents,
            processor_fee_cents,
            net_payout_cents,
        })
    }

    /// Cancel a booking and release its authorization.
    pub async fn cancel_booking(&self, booking_id: &str) -> Result<CancelOutcome> {
        (|| self.try_cancel_booking(booking_id))
            .retry(conflict_backoff())
            .when(is_retryable)
            .await
    }

    async fn try_cancel_booking(&self, booking_id: &str) -> Result<CancelOutcome> {
        let mut booking = self.bookings.get(booking_id).await?;

        if booking.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid(booking_id.to_string()));
        }
        if booking.status == BookingStatus::Cancelled {
            return Ok(CancelOutcome {
                status: booking.status,
                warning: None,
            });
        }

        let mut warning = None;
        if let Some(intent_id) = booking.payment_intent_id.clone() {
            match self.processor.cancel_intent(&intent_id).await {
                Ok(_) => {}
                Err(ProcessorError::AlreadyCanceled(id)) => {
                    warning = Some(format!("authorization {id} was already canceled"));
                }
                Err(ProcessorError::Missing(id)) => {
                    warning = Some(format!("authorization {id} no longer exists"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        booking.status = BookingStatus::Cancelled;
        booking.payment_status = PaymentStatus::Cancelled;
        let updated = self.bookings.update(&booking).await?;

        info!(booking = %booking_id, "cancelled booking");
        Ok(CancelOutcome {
            status: updated.status,
            warning,
        })
    }

    /// Actual processor fee from the settled charge, falling back to the
    /// estimate when the settlement cannot provide one.
    async fn settled_fee(&self, intent_id: &str, booking: &Booking) -> i64 {
        match self.processor.retrieve_settlement(intent_id).await {
            Ok(Some(settlement)) => match settlement.processor_fee_cents {
                Some(fee) => fee,
                None => {
                    warn!(
                        intent = %intent_id,
                        charge = %settlement.charge_id,
                        "settlement carries no fee yet, using estimate"
                    );
                    self.fees
                        .estimated_processor_fee(booking.payment_amount_cents)
                }
            },
            Ok(None) => {
                warn!(intent = %intent_id, "no settled charge found, using fee estimate");
                self.fees
                    .estimated_processor_fee(booking.payment_amount_cents)
            }
            Err(e) => {
                warn!(intent = %intent_id, error = %e, "settlement lookup failed, using fee estimate");
                self.fees
                    .estimated_processor_fee(booking.payment_amount_cents)
            }
        }
    }
}
