//! Coupon validation contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Money;

use crate::error::CheckoutError;

/// Coupon validation against an order subtotal.
#[async_trait]
pub trait CouponService: Send + Sync {
    /// Validates the code and returns the discount to apply. Rejects
    /// unknown codes and orders below the coupon's minimum subtotal.
    async fn apply(&self, code: &str, subtotal: Money) -> Result<Money, CheckoutError>;
}

#[derive(Debug, Clone, Copy)]
struct CouponRule {
    discount: Money,
    min_subtotal: Money,
}

/// In-memory coupon service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponService {
    coupons: Arc<RwLock<HashMap<String, CouponRule>>>,
}

impl InMemoryCouponService {
    /// Creates a coupon service with no codes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coupon code.
    pub fn add_coupon(&self, code: &str, discount: Money, min_subtotal: Money) {
        self.coupons.write().unwrap().insert(
            code.to_string(),
            CouponRule {
                discount,
                min_subtotal,
            },
        );
    }
}

#[async_trait]
impl CouponService for InMemoryCouponService {
    async fn apply(&self, code: &str, subtotal: Money) -> Result<Money, CheckoutError> {
        let rule = {
            let coupons = self.coupons.read().unwrap();
            coupons.get(code).copied()
        };

        let Some(rule) = rule else {
            return Err(CheckoutError::CouponRejected {
                reason: format!("unknown or expired code {code}"),
            });
        };
        if subtotal < rule.min_subtotal {
            return Err(CheckoutError::CouponRejected {
                reason: format!(
                    "code {code} requires a minimum subtotal of {}",
                    rule.min_subtotal
                ),
            });
        }
        // A discount never exceeds the subtotal itself.
        Ok(rule.discount.min(subtotal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn valid_coupon_returns_discount() {
        let coupons = InMemoryCouponService::new();
        coupons.add_coupon("SAVE10", Money::from_cents(1000), Money::from_cents(5000));

        let discount = coupons
            .apply("SAVE10", Money::from_cents(8000))
            .await
            .unwrap();
        assert_eq!(discount.cents(), 1000);
    }

    #[tokio::test]
    async fn unknown_code_rejected() {
        let coupons = InMemoryCouponService::new();
        let err = coupons
            .apply("NOPE", Money::from_cents(8000))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::CouponRejected { .. }));
    }

    #[tokio::test]
    async fn minimum_subtotal_enforced() {
        let coupons = InMemoryCouponService::new();
        coupons.add_coupon("SAVE10", Money::from_cents(1000), Money::from_cents(5000));

        let err = coupons
            .apply("SAVE10", Money::from_cents(4999))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::CouponRejected { .. }));
    }

    #[tokio::test]
    async fn discount_clamped_to_subtotal() {
        let coupons = InMemoryCouponService::new();
        coupons.add_coupon("BIG", Money::from_cents(10_000), Money::zero());

        let discount = coupons.apply("BIG", Money::from_cents(700)).await.unwrap();
        assert_eq!(discount.cents(), 700);
    }
}
