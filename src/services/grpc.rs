//! gRPC surface for the payment services.
//!
//! Thin request handlers: validate the payload, call into one service, map
//! the outcome to a reply or a `Status`.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::proto::{
    payments_server::Payments, BookingReply, CancelBookingReply, CancelBookingRequest,
    CancelPaymentIntentReply, CancelPaymentIntentRequest, CaptureBookingPaymentReply,
    CaptureBookingPaymentRequest, CreateOnboardingLinkReply, CreateOnboardingLinkRequest,
    CreatePaymentIntentRequest, MarkBookingCompletedRequest, Party, PaymentIntentReply,
    UpdateBookingAmountRequest, UpdatePaymentIntentReply, UpdatePaymentIntentRequest,
};
use crate::services::error::PaymentError;
use crate::services::intents::{IntentOrchestrator, IntentRequest};
use crate::services::provisioning::ProvisioningService;
use crate::services::settlement::{CompletionParty, SettlementService};

/// Payments gRPC service.
pub struct PaymentsApi {
    orchestrator: Arc<IntentOrchestrator>,
    settlement: Arc<SettlementService>,
    provisioning: Arc<ProvisioningService>,
}

impl PaymentsApi {
    pub fn new(
        orchestrator: Arc<IntentOrchestrator>,
        settlement: Arc<SettlementService>,
        provisioning: Arc<ProvisioningService>,
    ) -> Self {
        Self {
            orchestrator,
            settlement,
            provisioning,
        }
    }
}

/// Map a payment error to an HTTP-appropriate gRPC status.
fn status_from(error: PaymentError) -> Status {
    match &error {
        PaymentError::Validation(_) | PaymentError::Computation(_) => {
            Status::invalid_argument(error.to_string())
        }
        PaymentError::NotFound { .. } => Status::not_found(error.to_string()),
        PaymentError::NoPayoutAccount(_)
        | PaymentError::NotReady { .. }
        | PaymentError::AlreadyPaid(_) => Status::failed_precondition(error.to_string()),
        PaymentError::Conflict(_) => Status::aborted(error.to_string()),
        PaymentError::Processor(_) => Status::unavailable(error.to_string()),
        PaymentError::Storage(_) => Status::internal(error.to_string()),
    }
}

#[tonic::async_trait]
impl Payments for PaymentsApi {
    async fn create_payment_intent(
        &self,
        request: Request<CreatePaymentIntentRequest>,
    ) -> Result<Response<PaymentIntentReply>, Status> {
        let req = request.into_inner();
        let handle = self
            .orchestrator
            .create(IntentRequest {
                amount_cents: req.amount_cents,
                currency: req.currency,
                client_id: req.client_id,
                contractor_id: req.contractor_id,
                base_service_cents: req.base_service_cents,
            })
            .await
            .map_err(status_from)?;

        Ok(Response::new(PaymentIntentReply {
            intent_id: handle.intent_id,
            client_secret: handle.client_secret.unwrap_or_default(),
        }))
    }

    async fn update_payment_intent(
        &self,
        request: Request<UpdatePaymentIntentRequest>,
    ) -> Result<Response<UpdatePaymentIntentReply>, Status> {
        let req = request.into_inner();
        if req.intent_id.is_empty() {
            return Err(Status::invalid_argument("intent_id is required"));
        }
        let outcome = self
            .orchestrator
            .amend(&req.intent_id, req.amount_cents, req.base_service_cents)
            .await
            .map_err(status_from)?;

        Ok(Response::new(UpdatePaymentIntentReply {
            intent_id: outcome.intent_id,
            client_secret: outcome.client_secret.unwrap_or_default(),
            replaced: outcome.replaced,
        }))
    }

    async fn cancel_payment_intent(
        &self,
        request: Request<CancelPaymentIntentRequest>,
    ) -> Result<Response<CancelPaymentIntentReply>, Status> {
        let req = request.into_inner();
        if req.intent_id.is_empty() {
            return Err(Status::invalid_argument("intent_id is required"));
        }
        let status = self
            .orchestrator
            .cancel(&req.intent_id)
            .await
            .map_err(status_from)?;

        Ok(Response::new(CancelPaymentIntentReply {
            status: status.as_str().to_string(),
        }))
    }

    async fn update_booking_amount(
        &self,
        request: Request<UpdateBookingAmountRequest>,
    ) -> Result<Response<UpdatePaymentIntentReply>, Status> {
        let req = request.into_inner();
        if req.booking_id.is_empty() {
            return Err(Status::invalid_argument("booking_id is required"));
        }
        let outcome = self
            .orchestrator
            .sync_booking_amount(&req.booking_id, req.amount_cents, req.base_service_cents)
            .await
            .map_err(status_from)?;

        Ok(Response::new(UpdatePaymentIntentReply {
            intent_id: outcome.intent_id,
            client_secret: outcome.client_secret.unwrap_or_default(),
            replaced: outcome.replaced,
        }))
    }

    async fn mark_booking_completed(
        &self,
        request: Request<MarkBookingCompletedRequest>,
    ) -> Result<Response<BookingReply>, Status> {
        let req = request.into_inner();
        if req.booking_id.is_empty() {
            return Err(Status::invalid_argument("booking_id is required"));
        }
        let party = match Party::try_from(req.party) {
            Ok(Party::Client) => CompletionParty::Client,
            Ok(Party::Contractor) => CompletionParty::Contractor,
            _ => return Err(Status::invalid_argument("party must be client or contractor")),
        };

        let booking = self
            .settlement
            .record_completion(&req.booking_id, party)
            .await
            .map_err(status_from)?;

        Ok(Response::new(BookingReply {
            booking_id: booking.id,
            client_completed: booking.client_completed,
            contractor_completed: booking.contractor_completed,
            status: booking.status.as_str().to_string(),
            payment_status: booking.payment_status.as_str().to_string(),
        }))
    }

    async fn capture_booking_payment(
        &self,
        request: Request<CaptureBookingPaymentRequest>,
    ) -> Result<Response<CaptureBookingPaymentReply>, Status> {
        let req = request.into_inner();
        if req.booking_id.is_empty() {
            return Err(Status::invalid_argument("booking_id is required"));
        }
        let summary = self
            .settlement
            .capture(&req.booking_id)
            .await
            .map_err(status_from)?;

        Ok(Response::new(CaptureBookingPaymentReply {
            total_cents: summary.total_cents,
            platform_fee_cents: summary.platform_fee_cents,
            processor_fee_cents: summary.processor_fee_cents,
            net_payout_cents: summary.net_payout_cents,
        }))
    }

    async fn cancel_booking(
        &self,
        request: Request<CancelBookingRequest>,
    ) -> Result<Response<CancelBookingReply>, Status> {
        let req = request.into_inner();
        if req.booking_id.is_empty() {
            return Err(Status::invalid_argument("booking_id is required"));
        }
        let outcome = self
            .settlement
            .cancel_booking(&req.booking_id)
            .await
            .map_err(status_from)?;

        Ok(Response::new(CancelBookingReply {
            status: outcome.status.as_str().to_string(),
            warning: outcome.warning,
        }))
    }

    async fn create_onboarding_link(
        &self,
        request: Request<CreateOnboardingLinkRequest>,
    ) -> Result<Response<CreateOnboardingLinkReply>, Status> {
        let req = request.into_inner();
        if req.contractor_id.is_empty() {
            return Err(Status::invalid_argument("contractor_id is required"));
        }
        if req.refresh_url.is_empty() || req.return_url.is_empty() {
            return Err(Status::invalid_argument(
                "refresh_url and return_url are required",
            ));
        }
        let link = self
            .provisioning
            .onboarding_link(&req.contractor_id, &req.refresh_url, &req.return_url)
            .await
            .map_err(status_from)?;

        Ok(Response::new(CreateOnboardingLinkReply {
            url: link.url,
            account_id: link.account_id,
        }))
    }
}
