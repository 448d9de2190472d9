//! Payout-account and customer provisioning.
//!
//! External identifiers are only valid in the processor environment that
//! minted them. Every stored reference carries an environment tag; a tag
//! that disagrees with the running environment, or a mode-mismatch rejection
//! from the processor, retires the identifier and provisions a fresh one.
//! The stale id is never sent back to the processor.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Environment;
use crate::interfaces::processor::{PaymentProcessor, ProcessorError};
use crate::interfaces::profiles::{
    ClientProfile, ContractorProfile, CustomerRef, PayoutAccountRef, ProfileStore,
};
use crate::services::error::{PaymentError, Result};

/// Onboarding link for a payout account.
#[derive(Debug, Clone)]
pub struct OnboardingLink {
    pub url: String,
    pub account_id: String,
}

/// Provisions and verifies processor-side accounts and customers.
pub struct ProvisioningService {
    processor: Arc<dyn PaymentProcessor>,
    profiles: Arc<dyn ProfileStore>,
    environment: Environment,
}

impl ProvisioningService {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        profiles: Arc<dyn ProfileStore>,
        environment: Environment,
    ) -> Self {
        Self {
            processor,
            profiles,
            environment,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Resolve the contractor's payout account for routing a transfer.
    ///
    /// A contractor who never onboarded has no account to resolve; that is
    /// [`PaymentError::NoPayoutAccount`], not an invitation to create one
    /// silently.
    pub async fn payout_account_for(&self, contractor_id: &str) -> Result<String> {
        let contractor = self.require_contractor(contractor_id).await?;
        let Some(stored) = contractor.payout_account.clone() else {
            return Err(PaymentError::NoPayoutAccount(contractor_id.to_string()));
        };

        match self.verify_account(&stored).await? {
            Some(id) => Ok(id),
            None => self.provision_account(&contractor).await,
        }
    }

    /// Resolve the client's payment customer, creating one on first use.
    pub async fn customer_for(&self, client_id: &str) -> Result<String> {
        let client = self.require_client(client_id).await?;

        if let Some(stored) = client.customer.clone() {
            if let Some(id) = self.verify_customer(&stored).await? {
                return Ok(id);
            }
        }
        self.provision_customer(&client).await
    }

    /// Create (or reuse) the contractor's payout account and mint an
    /// onboarding link for it.
    pub async fn onboarding_link(
        &self,
        contractor_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<OnboardingLink> {
        let contractor = self.require_contractor(contractor_id).await?;

        let account_id = match contractor.payout_account.clone() {
            None => self.provision_account(&contractor).await?,
            Some(stored) => match self.verify_account(&stored).await? {
                Some(id) => id,
                None => self.provision_account(&contractor).await?,
            },
        };

        let url = self
            .processor
            .create_onboarding_link(&account_id, refresh_url, return_url)
            .await?;
        Ok(OnboardingLink { url, account_id })
    }

    async fn require_contractor(&self, id: &str) -> Result<ContractorProfile> {
        self.profiles
            .contractor(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound {
                kind: "contractor",
                id: id.to_string(),
            })
    }

    async fn require_client(&self, id: &str) -> Result<ClientProfile> {
        self.profiles
            .client(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound {
                kind: "client",
                id: id.to_string(),
            })
    }

    /// Check a stored account against the running environment.
    ///
    /// `Ok(None)` means the reference is stale and must be replaced.
    async fn verify_account(&self, stored: &PayoutAccountRef) -> Result<Option<String>> {
        if stored.environment != self.environment {
            info!(
                account = %stored.account_id,
                tagged = %stored.environment,
                running = %self.environment,
                "stored payout account belongs to the other environment"
            );
            return Ok(None);
        }
        match self
            .processor
            .retrieve_payout_account(&stored.account_id)
            .await
        {
            Ok(account) => Ok(Some(account.id)),
            Err(ProcessorError::ModeMismatch { id }) => {
                warn!(account = %id, "payout account rejected as cross-mode despite matching tag");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn verify_customer(&self, stored: &CustomerRef) -> Result<Option<String>> {
        if stored.environment != self.environment {
            info!(
                customer = %stored.customer_id,
                tagged = %stored.environment,
                running = %self.environment,
                "stored customer belongs to the other environment"
            );
            return Ok(None);
        }
        match self.processor.retrieve_customer(&stored.customer_id).await {
            Ok(customer) => Ok(Some(customer.id)),
            Err(ProcessorError::ModeMismatch { id }) => {
                warn!(customer = %id, "customer rejected as cross-mode despite matching tag");
                Ok(None)
            }
            Err(ProcessorError::Missing(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn provision_account(&self, contractor: &ContractorProfile) -> Result<String> {
        let fresh = self
            .processor
            .create_payout_account(&contractor.email)
            .await?;
        let reference = PayoutAccountRef {
            account_id: fresh.id.clone(),
            environment: self.environment,
            created_at: Utc::now(),
        };
        self.profiles
            .set_payout_account(&contractor.id, &reference)
            .await?;
        info!(
            contractor = %contractor.id,
            account = %fresh.id,
            environment = %self.environment,
            "provisioned payout account"
        );
        Ok(fresh.id)
    }

    async fn provision_customer(&self, client: &ClientProfile) -> Result<String> {
        let fresh = self.processor.create_customer(&client.email).await?;
        let reference = CustomerRef {
            customer_id: fresh.id.clone(),
            environment: self.environment,
            created_at: Utc::now(),
        };
        self.profiles.set_customer(&client.id, &reference).await?;
        info!(
            client = %client.id,
            customer = %fresh.id,
            environment = %self.environment,
            "provisioned payment customer"
        );
        Ok(fresh.id)
    }
}
