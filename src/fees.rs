//! Fee computation.
//!
//! Pure arithmetic over integer minor currency units (cents). The platform
//! fee is a percentage of the service price; the processor fee is the usual
//! percentage-plus-fixed card model and is only an estimate until the charge
//! settles.
//!
//! Two fee structures coexist:
//! - Current: the contractor quotes a base service price, keeps it in full,
//!   and fees are billed on top to the client.
//! - Legacy: the booking carries a single total and fees are deducted from
//!   it to derive the contractor transfer.

use serde::{Deserialize, Serialize};

/// Fee rates, injected from configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Platform commission in basis points (500 = 5%).
    pub platform_fee_bps: u32,
    /// Processor percentage in basis points (290 = 2.9%).
    pub processor_fee_bps: u32,
    /// Processor fixed fee per transaction, in cents.
    pub processor_fixed_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_bps: 500,
            processor_fee_bps: 290,
            processor_fixed_cents: 30,
        }
    }
}

/// Fee breakdown for one authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    /// Platform commission in cents.
    pub platform_fee_cents: i64,
    /// Estimated processor fee in cents. Replaced by the settled fee at
    /// capture time.
    pub estimated_processor_fee_cents: i64,
    /// Amount routed to the contractor's payout account, in cents.
    pub transfer_cents: i64,
}

/// Errors from fee computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("amount must be positive, got {0} cents")]
    NonPositiveAmount(i64),

    #[error("base service amount must be positive, got {0} cents")]
    NonPositiveBase(i64),

    #[error("fees of {fees} cents leave no transfer from {amount} cents")]
    TransferExhausted { amount: i64, fees: i64 },
}

/// Basis-point share of an amount, rounded half up.
fn bps_share(amount_cents: i64, bps: u32) -> i64 {
    (amount_cents * i64::from(bps) + 5_000) / 10_000
}

impl FeeSchedule {
    /// Platform commission on a service price.
    pub fn platform_fee(&self, amount_cents: i64) -> i64 {
        bps_share(amount_cents, self.platform_fee_bps)
    }

    /// Estimated processor fee for a charge of the given size.
    pub fn estimated_processor_fee(&self, amount_cents: i64) -> i64 {
        bps_share(amount_cents, self.processor_fee_bps) + self.processor_fixed_cents
    }

    /// Compute the fee breakdown for an authorization.
    ///
    /// With `base_service_cents` present, the transfer equals the base
    /// unchanged and the platform fee is computed on it; the client is
    /// billed fees on top. Without it, fees are deducted from
    /// `amount_cents` to derive the transfer.
    ///
    /// A non-positive transfer is an error; it must be rejected before any
    /// processor call is made.
    pub fn quote(
        &self,
        amount_cents: i64,
        base_service_cents: Option<i64>,
    ) -> Result<FeeQuote, FeeError> {
        if amount_cents <= 0 {
            return Err(FeeError::NonPositiveAmount(amount_cents));
        }

        match base_service_cents {
            Some(base) => {
                if base <= 0 {
                    return Err(FeeError::NonPositiveBase(base));
                }
                Ok(FeeQuote {
                    platform_fee_cents: self.platform_fee(base),
                    estimated_processor_fee_cents: self.estimated_processor_fee(amount_cents),
                    transfer_cents: base,
                })
            }
            None => {
                let platform = self.platform_fee(amount_cents);
                let processor = self.estimated_processor_fee(amount_cents);
                let transfer = amount_cents - platform - processor;
                if transfer <= 0 {
                    return Err(FeeError::TransferExhausted {
                        amount: amount_cents,
                        fees: platform + processor,
                    });
                }
                Ok(FeeQuote {
                    platform_fee_cents: platform,
                    estimated_processor_fee_cents: processor,
                    transfer_cents: transfer,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_service_transfers_unchanged() {
        let fees = FeeSchedule::default();
        // $100 booking at a $100 base: 5% platform fee, full transfer.
        let quote = fees.quote(10_000, Some(10_000)).unwrap();
        assert_eq!(quote.platform_fee_cents, 500);
        assert_eq!(quote.transfer_cents, 10_000);
    }

    #[test]
    fn base_transfer_is_exact_for_odd_amounts() {
        let fees = FeeSchedule::default();
        for base in [1, 33, 999, 10_001, 123_457] {
            let quote = fees.quote(base + 1_000, Some(base)).unwrap();
            assert_eq!(quote.transfer_cents, base);
            assert!(quote.platform_fee_cents >= 0);
            assert!(quote.estimated_processor_fee_cents >= 0);
        }
    }

    #[test]
    fn legacy_amount_has_fees_deducted() {
        let fees = FeeSchedule::default();
        let quote = fees.quote(10_000, None).unwrap();
        // 500 platform + (290 + 30) processor estimate.
        assert_eq!(quote.platform_fee_cents, 500);
        assert_eq!(quote.estimated_processor_fee_cents, 320);
        assert_eq!(quote.transfer_cents, 10_000 - 500 - 320);
    }

    #[test]
    fn rounding_is_half_up() {
        let fees = FeeSchedule {
            platform_fee_bps: 500,
            processor_fee_bps: 290,
            processor_fixed_cents: 30,
        };
        // 5% of 10 cents is 0.5 cents, rounded up to 1.
        assert_eq!(fees.platform_fee(10), 1);
        // 5% of 9 cents is 0.45 cents, rounded down to 0.
        assert_eq!(fees.platform_fee(9), 0);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let fees = FeeSchedule::default();
        assert!(matches!(
            fees.quote(0, None),
            Err(FeeError::NonPositiveAmount(0))
        ));
        assert!(matches!(
            fees.quote(-500, Some(100)),
            Err(FeeError::NonPositiveAmount(-500))
        ));
        assert!(matches!(
            fees.quote(1_000, Some(0)),
            Err(FeeError::NonPositiveBase(0))
        ));
    }

    #[test]
    fn rejects_exhausted_legacy_transfer() {
        let fees = FeeSchedule::default();
        // 31 cents: 2 platform + 31 processor estimate leaves nothing.
        let err = fees.quote(31, None).unwrap_err();
        assert!(matches!(err, FeeError::TransferExhausted { .. }));
    }
}
