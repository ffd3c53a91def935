//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Processing ──► PaymentPending ──► Paid ──► Preparing ──► Shipped ──► Delivered
///    │             │               │              │           │            │
///    └─────────────┴───────────────┴──────────────┴───────────┴────────────┴──► Cancelled
///                                                                               Refunded
///                                                                               Failed
/// ```
///
/// `Cancelled`, `Refunded` and `Failed` are reachable from every state
/// before `Delivered`; `Delivered`, `Cancelled`, `Refunded` and `Failed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order record assembled, not yet persisted or reserved.
    #[default]
    Pending,

    /// Creation in flight: inventory reserved, awaiting payment initiation.
    Processing,

    /// Payment initiated with the gateway, awaiting confirmation.
    PaymentPending,

    /// Payment confirmed; reservations committed.
    Paid,

    /// Order is being picked and packed.
    Preparing,

    /// Handed to the carrier.
    Shipped,

    /// Received by the customer (terminal).
    Delivered,

    /// Order was cancelled (terminal).
    Cancelled,

    /// Payment was reversed after cancellation (terminal).
    Refunded,

    /// Order creation failed after the record was persisted (terminal).
    Failed,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
                | OrderStatus::Failed
        )
    }

    /// Returns true if a customer-facing cancellation is accepted in this
    /// status. `Processing` is excluded: it only exists while a create
    /// attempt holds the customer lock.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::PaymentPending
                | OrderStatus::Paid
                | OrderStatus::Preparing
        )
    }

    /// Returns true if inventory reserved for this order has been
    /// committed (confirmed as sold) rather than merely held.
    pub fn inventory_committed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Preparing | OrderStatus::Shipped
        )
    }

    /// Returns true if the state machine permits moving to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match (*self, next) {
            (Pending, Processing)
            | (Processing, PaymentPending)
            | (PaymentPending, Paid)
            | (Paid, Preparing)
            | (Preparing, Shipped)
            | (Shipped, Delivered) => true,
            (from, Cancelled | Refunded | Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Validates a transition, returning the error used by [`crate::Order`].
    pub fn check_transition(&self, next: OrderStatus) -> Result<(), OrderError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::PaymentPending => "PaymentPending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
            OrderStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "PaymentPending" => Ok(OrderStatus::PaymentPending),
            "Paid" => Ok(OrderStatus::Paid),
            "Preparing" => Ok(OrderStatus::Preparing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            "Refunded" => Ok(OrderStatus::Refunded),
            "Failed" => Ok(OrderStatus::Failed),
            other => Err(OrderError::UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn forward_path_is_valid() {
        use OrderStatus::*;
        let path = [
            Pending,
            Processing,
            PaymentPending,
            Paid,
            Preparing,
            Shipped,
            Delivered,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn no_skipping_forward_states() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::PaymentPending));
        assert!(!OrderStatus::PaymentPending.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn no_backward_transitions() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::PaymentPending));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Preparing));
    }

    #[test]
    fn side_branches_from_non_terminal_states() {
        use OrderStatus::*;
        for from in [Pending, Processing, PaymentPending, Paid, Preparing, Shipped] {
            assert!(from.can_transition_to(Cancelled));
            assert!(from.can_transition_to(Refunded));
            assert!(from.can_transition_to(Failed));
        }
    }

    #[test]
    fn terminal_states_allow_nothing() {
        use OrderStatus::*;
        for from in [Delivered, Cancelled, Refunded, Failed] {
            assert!(from.is_terminal());
            for to in [
                Pending, Processing, PaymentPending, Paid, Preparing, Shipped, Delivered,
                Cancelled, Refunded, Failed,
            ] {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be invalid");
            }
        }
    }

    #[test]
    fn paid_never_reached_without_payment_pending() {
        use OrderStatus::*;
        for from in [Pending, Processing, Paid, Preparing, Shipped] {
            assert!(!from.can_transition_to(Paid));
        }
        assert!(PaymentPending.can_transition_to(Paid));
    }

    #[test]
    fn cancellable_statuses() {
        use OrderStatus::*;
        assert!(Pending.can_cancel());
        assert!(PaymentPending.can_cancel());
        assert!(Paid.can_cancel());
        assert!(Preparing.can_cancel());
        assert!(!Processing.can_cancel());
        assert!(!Shipped.can_cancel());
        assert!(!Delivered.can_cancel());
        assert!(!Cancelled.can_cancel());
    }

    #[test]
    fn check_transition_reports_both_ends() {
        let err = OrderStatus::Paid
            .check_transition(OrderStatus::Pending)
            .unwrap_err();
        match err {
            OrderError::InvalidTransition { from, to } => {
                assert_eq!(from, OrderStatus::Paid);
                assert_eq!(to, OrderStatus::Pending);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn status_string_roundtrip() {
        use OrderStatus::*;
        for status in [
            Pending, Processing, PaymentPending, Paid, Preparing, Shipped, Delivered,
            Cancelled, Refunded, Failed,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Unknown".parse::<OrderStatus>().is_err());
    }
}
