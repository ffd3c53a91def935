//! Payment gateway contract and in-memory implementation.
//!
//! The concrete wire protocols (card processors, wallets, local PSPs)
//! live behind this trait; the coordinator only sees the request and
//! response shapes below.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Wallet,
}

/// Result of a successful payment initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// The payment reference assigned by the gateway.
    pub payment_id: String,
    /// Gateway-side status of the intent.
    pub status: String,
}

/// Result of a successful refund call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refund {
    /// The refund reference assigned by the gateway.
    pub refund_id: String,
}

/// Gateway-level failure. The coordinator wraps this into its own
/// stable error kinds before it reaches a caller.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct GatewayError {
    pub reason: String,
}

impl GatewayError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Payment processing operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiates payment for an order.
    async fn process_payment(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        customer_id: CustomerId,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Refunds a previously initiated payment, optionally partial.
    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<Refund, GatewayError>;
}

#[derive(Debug, Default)]
struct GatewayState {
    payments: HashMap<String, (OrderId, CustomerId, PaymentMethod)>,
    refunds: Vec<(String, Option<Money>)>,
    next_id: u32,
    fail_on_process: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline payment initiation.
    pub fn set_fail_on_process(&self, fail: bool) {
        self.state.write().unwrap().fail_on_process = fail;
    }

    /// Configures the gateway to fail refund calls.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Returns the number of initiated payments.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }

    /// Returns the number of processed refunds.
    pub fn refund_count(&self) -> usize {
        self.state.read().unwrap().refunds.len()
    }

    /// Returns true if a payment exists with the given ID.
    pub fn has_payment(&self, payment_id: &str) -> bool {
        self.state.read().unwrap().payments.contains_key(payment_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn process_payment(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        customer_id: CustomerId,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_process {
            return Err(GatewayError::new("payment declined"));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(payment_id.clone(), (order_id, customer_id, method));

        Ok(PaymentIntent {
            payment_id,
            status: "pending".to_string(),
        })
    }

    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<Money>,
        _reason: Option<&str>,
    ) -> Result<Refund, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_refund {
            return Err(GatewayError::new("gateway timeout"));
        }
        if !state.payments.contains_key(payment_id) {
            return Err(GatewayError::new(format!("unknown payment {payment_id}")));
        }

        state.refunds.push((payment_id.to_string(), amount));
        state.next_id += 1;
        Ok(Refund {
            refund_id: format!("REF-{:04}", state.next_id),
        })
    }
}
