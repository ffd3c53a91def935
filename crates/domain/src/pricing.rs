//! Tax and shipping policy applied during checkout.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::order::ShippingAddress;

/// Flat-rate tax and tiered shipping policy.
///
/// Shipping is free at or above the subtotal threshold; below it a flat
/// fee applies, plus a surcharge for destinations in the remote-country
/// list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// ISO 4217 code stamped onto order totals.
    pub currency: String,
    /// Flat tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,
    /// Flat shipping fee below the free-shipping threshold.
    pub shipping_fee: Money,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Money,
    /// Extra fee for destinations in `remote_countries`.
    pub remote_surcharge: Money,
    /// Country codes that attract the remote surcharge.
    pub remote_countries: Vec<String>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            tax_rate_bps: 1000,
            shipping_fee: Money::from_cents(3000),
            free_shipping_threshold: Money::from_cents(50_000),
            remote_surcharge: Money::from_cents(2000),
            remote_countries: Vec::new(),
        }
    }
}

impl PricingPolicy {
    /// Tax on the given taxable amount (subtotal after discount).
    pub fn tax(&self, taxable: Money) -> Money {
        taxable.ratio_bps(self.tax_rate_bps)
    }

    /// Shipping cost for the given subtotal and destination.
    pub fn shipping_cost(&self, subtotal: Money, destination: &ShippingAddress) -> Money {
        if subtotal >= self.free_shipping_threshold {
            return Money::zero();
        }
        let remote = self
            .remote_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&destination.country));
        if remote {
            self.shipping_fee + self.remote_surcharge
        } else {
            self.shipping_fee
        }
    }
}
