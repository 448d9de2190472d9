//! REST client for the payment processor.
//!
//! Talks to a Stripe-compatible API: form-encoded writes, JSON reads,
//! secret-key basic auth. Errors are decoded from the standard
//! `{"error": {...}}` envelope and classified into [`ProcessorError`];
//! in particular the "a similar object exists in the other mode" rejection
//! becomes [`ProcessorError::ModeMismatch`] so callers can re-provision.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ProcessorConfig;
use crate::interfaces::processor::{
    Customer, IntentAmendment, IntentSpec, IntentStatus, PaymentIntent, PaymentProcessor,
    PayoutAccount, ProcessorError, Result, Settlement,
};

/// HTTP implementation of [`PaymentProcessor`].
pub struct HttpProcessor {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl HttpProcessor {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Form-encoded POST with an idempotency key.
    async fn post(
        &self,
        path: &str,
        params: &[(String, String)],
        id_hint: &str,
    ) -> Result<serde_json::Value> {
        debug!(path, "processor POST");
        let response = self
            .http
            .post(self.url(path))
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(params)
            .send()
            .await?;
        decode(response, id_hint).await
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        id_hint: &str,
    ) -> Result<serde_json::Value> {
        debug!(path, "processor GET");
        let response = self
            .http
            .get(self.url(path))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(query)
            .send()
            .await?;
        decode(response, id_hint).await
    }
}

/// Decode a response body, mapping the error envelope to [`ProcessorError`].
async fn decode(response: reqwest::Response, id_hint: &str) -> Result<serde_json::Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
    let error = body.get("error");
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .unwrap_or("");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("")
        .to_string();

    Err(classify(status.as_u16(), code, message, id_hint))
}

/// Map an API rejection to the error taxonomy.
fn classify(status: u16, code: &str, message: String, id: &str) -> ProcessorError {
    let lower = message.to_ascii_lowercase();

    if code == "resource_missing" || status == 404 {
        // "A similar object exists in live mode, but a test mode key was
        // used" marks a cross-environment identifier.
        if lower.contains("test mode") || lower.contains("live mode") {
            return ProcessorError::ModeMismatch { id: id.to_string() };
        }
        return ProcessorError::Missing(id.to_string());
    }

    if code == "payment_intent_unexpected_state" {
        if lower.contains("captur") {
            return ProcessorError::AlreadyCaptured(id.to_string());
        }
        if lower.contains("cancel") {
            return ProcessorError::AlreadyCanceled(id.to_string());
        }
    }

    ProcessorError::Api { status, message }
}

#[derive(Deserialize)]
struct IntentPayload {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    currency: String,
    customer: Option<String>,
    #[serde(default)]
    transfer_data: Option<TransferDataPayload>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TransferDataPayload {
    destination: String,
    #[serde(default)]
    amount: Option<i64>,
}

impl IntentPayload {
    fn into_intent(self) -> Result<PaymentIntent> {
        let status = IntentStatus::parse(&self.status).ok_or_else(|| ProcessorError::Api {
            status: 200,
            message: format!("unexpected intent status: {}", self.status),
        })?;
        let (destination_account, transfer_cents) = match self.transfer_data {
            Some(t) => (Some(t.destination), t.amount),
            None => (None, None),
        };
        Ok(PaymentIntent {
            id: self.id,
            client_secret: self.client_secret,
            status,
            amount_cents: self.amount,
            currency: self.currency,
            customer_id: self.customer,
            destination_account,
            transfer_cents,
            metadata: self.metadata,
        })
    }
}

fn parse_intent(body: serde_json::Value) -> Result<PaymentIntent> {
    let payload: IntentPayload =
        serde_json::from_value(body).map_err(|e| ProcessorError::Api {
            status: 200,
            message: format!("unreadable intent payload: {e}"),
        })?;
    payload.into_intent()
}

fn metadata_params(metadata: &HashMap<String, String>) -> Vec<(String, String)> {
    metadata
        .iter()
        .map(|(k, v)| (format!("metadata[{k}]"), v.clone()))
        .collect()
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    async fn create_intent(&self, spec: IntentSpec) -> Result<PaymentIntent> {
        let mut params = vec![
            ("amount".to_string(), spec.amount_cents.to_string()),
            ("currency".to_string(), spec.currency.to_lowercase()),
            ("customer".to_string(), spec.customer_id),
            ("capture_method".to_string(), "manual".to_string()),
            (
                "transfer_data[destination]".to_string(),
                spec.destination_account,
            ),
            (
                "transfer_data[amount]".to_string(),
                spec.transfer_cents.to_string(),
            ),
        ];
        params.extend(metadata_params(&spec.metadata));

        let body = self.post("/v1/payment_intents", &params, "").await?;
        parse_intent(body)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent> {
        let body = self
            .get(&format!("/v1/payment_intents/{id}"), &[], id)
            .await?;
        parse_intent(body)
    }

    async fn update_intent(&self, id: &str, amendment: IntentAmendment) -> Result<PaymentIntent> {
        let mut params = vec![
            ("amount".to_string(), amendment.amount_cents.to_string()),
            (
                "transfer_data[amount]".to_string(),
                amendment.transfer_cents.to_string(),
            ),
        ];
        params.extend(metadata_params(&amendment.metadata));

        let body = self
            .post(&format!("/v1/payment_intents/{id}"), &params, id)
            .await?;
        parse_intent(body)
    }

    async fn cancel_intent(&self, id: &str) -> Result<PaymentIntent> {
        let body = self
            .post(&format!("/v1/payment_intents/{id}/cancel"), &[], id)
            .await?;
        parse_intent(body)
    }

    async fn capture_intent(&self, id: &str) -> Result<PaymentIntent> {
        let body = self
            .post(&format!("/v1/payment_intents/{id}/capture"), &[], id)
            .await?;
        parse_intent(body)
    }

    async fn retrieve_settlement(&self, intent_id: &str) -> Result<Option<Settlement>> {
        let body = self
            .get(
                &format!("/v1/payment_intents/{intent_id}"),
                &[("expand[]", "latest_charge.balance_transaction")],
                intent_id,
            )
            .await?;

        match body.get("latest_charge") {
            None | Some(serde_json::Value::Null) => Ok(None),
            // Unexpanded reference: the charge exists but the fee is not in
            // hand.
            Some(serde_json::Value::String(charge_id)) => Ok(Some(Settlement {
                charge_id: charge_id.clone(),
                processor_fee_cents: None,
            })),
            Some(serde_json::Value::Object(charge)) => {
                let charge_id = charge
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let processor_fee_cents = charge
                    .get("balance_transaction")
                    .and_then(|bt| bt.as_object())
                    .and_then(|bt| bt.get("fee"))
                    .and_then(|fee| fee.as_i64());
                Ok(Some(Settlement {
                    charge_id,
                    processor_fee_cents,
                }))
            }
            Some(other) => Err(ProcessorError::Api {
                status: 200,
                message: format!("unreadable latest_charge: {other}"),
            }),
        }
    }

    async fn create_payout_account(&self, email: &str) -> Result<PayoutAccount> {
        let params = vec![
            ("type".to_string(), "express".to_string()),
            ("email".to_string(), email.to_string()),
        ];
        let body = self.post("/v1/accounts", &params, "").await?;
        parse_account(body)
    }

    async fn retrieve_payout_account(&self, id: &str) -> Result<PayoutAccount> {
        let body = self.get(&format!("/v1/accounts/{id}"), &[], id).await?;
        parse_account(body)
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String> {
        let params = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        let body = self.post("/v1/account_links", &params, account_id).await?;
        body.get("url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProcessorError::Api {
                status: 200,
                message: "account link response carried no url".to_string(),
            })
    }

    async fn create_customer(&self, email: &str) -> Result<Customer> {
        let params = vec![("email".to_string(), email.to_string())];
        let body = self.post("/v1/customers", &params, "").await?;
        parse_customer(body)
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Customer> {
        let body = self.get(&format!("/v1/customers/{id}"), &[], id).await?;
        parse_customer(body)
    }
}

fn parse_account(body: serde_json::Value) -> Result<PayoutAccount> {
    #[derive(Deserialize)]
    struct AccountPayload {
        id: String,
        #[serde(default)]
        details_submitted: bool,
    }
    let payload: AccountPayload =
        serde_json::from_value(body).map_err(|e| ProcessorError::Api {
            status: 200,
            message: format!("unreadable account payload: {e}"),
        })?;
    Ok(PayoutAccount {
        id: payload.id,
        details_submitted: payload.details_submitted,
    })
}

fn parse_customer(body: serde_json::Value) -> Result<Customer> {
    let id = body
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ProcessorError::Api {
            status: 200,
            message: "customer response carried no id".to_string(),
        })?;
    Ok(Customer { id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_mode_mismatch() {
        let err = classify(
            404,
            "resource_missing",
            "No such account: 'acct_1'; a similar object exists in live mode, \
             but a test mode key was used to make this request."
                .to_string(),
            "acct_1",
        );
        assert!(matches!(err, ProcessorError::ModeMismatch { id } if id == "acct_1"));
    }

    #[test]
    fn classifies_plain_missing() {
        let err = classify(
            404,
            "resource_missing",
            "No such payment_intent: 'pi_1'".to_string(),
            "pi_1",
        );
        assert!(matches!(err, ProcessorError::Missing(id) if id == "pi_1"));
    }

    #[test]
    fn classifies_already_captured() {
        let err = classify(
            400,
            "payment_intent_unexpected_state",
            "This PaymentIntent could not be captured because it has already been captured."
                .to_string(),
            "pi_1",
        );
        assert!(matches!(err, ProcessorError::AlreadyCaptured(_)));
    }

    #[test]
    fn other_rejections_surface_verbatim() {
        let err = classify(402, "card_declined", "Your card was declined.".to_string(), "");
        match err {
            ProcessorError::Api { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_intent_payload() {
        let body = serde_json::json!({
            "id": "pi_1",
            "client_secret": "pi_1_secret",
            "status": "requires_capture",
            "amount": 10_500,
            "currency": "usd",
            "customer": "cus_1",
            "transfer_data": { "destination": "acct_1", "amount": 10_000 },
            "metadata": { "platform_fee_cents": "500" }
        });
        let intent = parse_intent(body).unwrap();
        assert_eq!(intent.status, IntentStatus::RequiresCapture);
        assert_eq!(intent.transfer_cents, Some(10_000));
        assert_eq!(intent.destination_account.as_deref(), Some("acct_1"));
    }
}
