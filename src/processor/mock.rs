//! Mock payment processor for testing.
//!
//! Stores intents, payout accounts, and customers in memory, tracks call
//! counts, and simulates the processor's mode handling: an identifier minted
//! under one environment is rejected with a mode mismatch when retrieved
//! under the other.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::Environment;
use crate::interfaces::processor::{
    Customer, IntentAmendment, IntentSpec, IntentStatus, PaymentIntent, PaymentProcessor,
    PayoutAccount, ProcessorError, Result, Settlement,
};

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallCounts {
    pub create_intent: u32,
    pub retrieve_intent: u32,
    pub update_intent: u32,
    pub cancel_intent: u32,
    pub capture_intent: u32,
    pub retrieve_settlement: u32,
    pub create_payout_account: u32,
    pub retrieve_payout_account: u32,
    pub create_onboarding_link: u32,
    pub create_customer: u32,
    pub retrieve_customer: u32,
}

impl CallCounts {
    /// Total calls of any kind.
    pub fn total(&self) -> u32 {
        self.create_intent
            + self.retrieve_intent
            + self.update_intent
            + self.cancel_intent
            + self.capture_intent
            + self.retrieve_settlement
            + self.create_payout_account
            + self.retrieve_payout_account
            + self.create_onboarding_link
            + self.create_customer
            + self.retrieve_customer
    }
}

#[derive(Default)]
struct State {
    intents: HashMap<String, PaymentIntent>,
    accounts: HashMap<String, (PayoutAccount, Environment)>,
    customers: HashMap<String, (Customer, Environment)>,
    next_id: u64,
    calls: CallCounts,
    /// Fee reported by the settled balance transaction. `None` simulates a
    /// settlement whose balance transaction has not materialized.
    settlement_fee_cents: Option<i64>,
    fail_on_capture: bool,
}

/// Mock implementation of [`PaymentProcessor`].
pub struct MockProcessor {
    environment: Environment,
    state: RwLock<State>,
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new(Environment::Test)
    }
}

impl MockProcessor {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            state: RwLock::new(State {
                settlement_fee_cents: Some(320),
                ..State::default()
            }),
        }
    }

    /// Register a payout account minted under the given environment.
    pub async fn seed_payout_account(&self, id: &str, environment: Environment) {
        let mut state = self.state.write().await;
        state.accounts.insert(
            id.to_string(),
            (
                PayoutAccount {
                    id: id.to_string(),
                    details_submitted: true,
                },
                environment,
            ),
        );
    }

    /// Register a customer minted under the given environment.
    pub async fn seed_customer(&self, id: &str, environment: Environment) {
        let mut state = self.state.write().await;
        state
            .customers
            .insert(id.to_string(), (Customer { id: id.to_string() }, environment));
    }

    /// Force an intent into a status, simulating payer-side progress.
    pub async fn force_status(&self, intent_id: &str, status: IntentStatus) {
        let mut state = self.state.write().await;
        if let Some(intent) = state.intents.get_mut(intent_id) {
            intent.status = status;
        }
    }

    /// Set the fee the settled balance transaction reports.
    pub async fn set_settlement_fee(&self, fee_cents: Option<i64>) {
        self.state.write().await.settlement_fee_cents = fee_cents;
    }

    pub async fn set_fail_on_capture(&self, fail: bool) {
        self.state.write().await.fail_on_capture = fail;
    }

    /// Snapshot of call counters.
    pub async fn calls(&self) -> CallCounts {
        self.state.read().await.calls
    }

    /// Inspect an intent's current state.
    pub async fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.state.read().await.intents.get(id).cloned()
    }

    fn next_id(state: &mut State, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}_mock_{}", state.next_id)
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn create_intent(&self, spec: IntentSpec) -> Result<PaymentIntent> {
        let mut state = self.state.write().await;
        state.calls.create_intent += 1;

        let id = Self::next_id(&mut state, "pi");
        let intent = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret")),
            status: IntentStatus::RequiresPaymentMethod,
            amount_cents: spec.amount_cents,
            currency: spec.currency,
            customer_id: Some(spec.customer_id),
            destination_account: Some(spec.destination_account),
            transfer_cents: Some(spec.transfer_cents),
            metadata: spec.metadata,
        };
        state.intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent> {
        let mut state = self.state.write().await;
        state.calls.retrieve_intent += 1;
        state
            .intents
            .get(id)
            .cloned()
            .ok_or_else(|| ProcessorError::Missing(id.to_string()))
    }

    async fn update_intent(&self, id: &str, amendment: IntentAmendment) -> Result<PaymentIntent> {
        let mut state = self.state.write().await;
        state.calls.update_intent += 1;

        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| ProcessorError::Missing(id.to_string()))?;
        if !intent.status.is_pre_authorization() {
            return Err(ProcessorError::Api {
                status: 400,
                message: format!("intent is {}, amount can no longer change in place", intent.status),
            });
        }
        intent.amount_cents = amendment.amount_cents;
        intent.transfer_cents = Some(amendment.transfer_cents);
        intent.metadata = amendment.metadata;
        Ok(intent.clone())
    }

    async fn cancel_intent(&self, id: &str) -> Result<PaymentIntent> {
        let mut state = self.state.write().await;
        state.calls.cancel_intent += 1;

        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| ProcessorError::Missing(id.to_string()))?;
        match intent.status {
            IntentStatus::Canceled => Err(ProcessorError::AlreadyCanceled(id.to_string())),
            IntentStatus::Succeeded => Err(ProcessorError::Api {
                status: 400,
                message: "a succeeded intent cannot be canceled".to_string(),
            }),
            _ => {
                intent.status = IntentStatus::Canceled;
                Ok(intent.clone())
            }
        }
    }

    async fn capture_intent(&self, id: &str) -> Result<PaymentIntent> {
        let mut state = self.state.write().await;
        state.calls.capture_intent += 1;

        if state.fail_on_capture {
            return Err(ProcessorError::Api {
                status: 402,
                message: "capture declined".to_string(),
            });
        }

        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| ProcessorError::Missing(id.to_string()))?;
        match intent.status {
            IntentStatus::Succeeded => Err(ProcessorError::AlreadyCaptured(id.to_string())),
            IntentStatus::RequiresCapture => {
                intent.status = IntentStatus::Succeeded;
                Ok(intent.clone())
            }
            other => Err(ProcessorError::Api {
                status: 400,
                message: format!("intent is {other}, not requires_capture"),
            }),
        }
    }

    async fn retrieve_settlement(&self, intent_id: &str) -> Result<Option<Settlement>> {
        let mut state = self.state.write().await;
        state.calls.retrieve_settlement += 1;

        let intent = state
            .intents
            .get(intent_id)
            .ok_or_else(|| ProcessorError::Missing(intent_id.to_string()))?;
        if intent.status != IntentStatus::Succeeded {
            return Ok(None);
        }
        Ok(Some(Settlement {
            charge_id: format!("ch_{intent_id}"),
            processor_fee_cents: state.settlement_fee_cents,
        }))
    }

    async fn create_payout_account(&self, _email: &str) -> Result<PayoutAccount> {
        let mut state = self.state.write().await;
        state.calls.create_payout_account += 1;

        let id = Self::next_id(&mut state, "acct");
        let account = PayoutAccount {
            id: id.clone(),
            details_submitted: false,
        };
        state
            .accounts
            .insert(id, (account.clone(), self.environment));
        Ok(account)
    }

    async fn retrieve_payout_account(&self, id: &str) -> Result<PayoutAccount> {
        let mut state = self.state.write().await;
        state.calls.retrieve_payout_account += 1;

        match state.accounts.get(id) {
            None => Err(ProcessorError::Missing(id.to_string())),
            Some((_, environment)) if *environment != self.environment => {
                Err(ProcessorError::ModeMismatch { id: id.to_string() })
            }
            Some((account, _)) => Ok(account.clone()),
        }
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        return_url: &str,
    ) -> Result<String> {
        let mut state = self.state.write().await;
        state.calls.create_onboarding_link += 1;

        if !state.accounts.contains_key(account_id) {
            return Err(ProcessorError::Missing(account_id.to_string()));
        }
        Ok(format!(
            "https://connect.mock/setup/{account_id}?return={return_url}"
        ))
    }

    async fn create_customer(&self, _email: &str) -> Result<Customer> {
        let mut state = self.state.write().await;
        state.calls.create_customer += 1;

        let id = Self::next_id(&mut state, "cus");
        let customer = Customer { id: id.clone() };
        state
            .customers
            .insert(id, (customer.clone(), self.environment));
        Ok(customer)
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Customer> {
        let mut state = self.state.write().await;
        state.calls.retrieve_customer += 1;

        match state.customers.get(id) {
            None => Err(ProcessorError::Missing(id.to_string())),
            Some((_, environment)) if *environment != self.environment => {
                Err(ProcessorError::ModeMismatch { id: id.to_string() })
            }
            Some((customer, _)) => Ok(customer.clone()),
        }
    }
}
