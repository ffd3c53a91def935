//! Compensation records for unwinding a failed create-order attempt.
//!
//! Each successful reservation appends an explicit, serializable undo
//! record rather than a captured closure, so the pending compensation
//! set can be inspected and logged at the moment it runs.

use common::{OrderId, ProductId};
use inventory::InventoryStore;
use serde::{Deserialize, Serialize};

/// A temporary hold on product stock tied to one create-order attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A single undo step, interpreted by [`run_compensations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CompensationAction {
    /// Return a reserved quantity to available stock.
    ReleaseStock { product_id: ProductId, quantity: u32 },
}

/// In-memory record of one create-order attempt.
///
/// Created at the start of the attempt, discarded on success, and
/// replayed (compensations executed in reverse) on failure. Never
/// persisted beyond the attempt.
#[derive(Debug, Default)]
pub struct OrderTransaction {
    order_id: Option<OrderId>,
    reservations: Vec<Reservation>,
    compensations: Vec<CompensationAction>,
}

impl OrderTransaction {
    /// Starts an empty transaction record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates the attempt with the order record once it exists.
    pub fn bind_order(&mut self, order_id: OrderId) {
        self.order_id = Some(order_id);
    }

    /// The order this attempt produced, if it got that far.
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Records a successful reservation and its undo action.
    pub fn record_reservation(&mut self, product_id: ProductId, quantity: u32) {
        self.reservations.push(Reservation {
            product_id: product_id.clone(),
            quantity,
        });
        self.compensations.push(CompensationAction::ReleaseStock {
            product_id,
            quantity,
        });
    }

    /// Reservations made so far in this attempt.
    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Pending undo actions, in the order they were recorded.
    pub fn compensations(&self) -> &[CompensationAction] {
        &self.compensations
    }

    /// True if nothing has been reserved yet.
    pub fn is_empty(&self) -> bool {
        self.compensations.is_empty()
    }
}

/// Executes the recorded compensations in reverse order.
///
/// A failing undo step is logged and does not stop the remaining steps;
/// the original failure that triggered compensation is what propagates
/// to the caller.
pub async fn run_compensations(inventory: &dyn InventoryStore, txn: &OrderTransaction) {
    if txn.is_empty() {
        return;
    }
    tracing::warn!(
        order_id = ?txn.order_id(),
        pending = txn.compensations().len(),
        "unwinding order attempt"
    );

    for action in txn.compensations().iter().rev() {
        metrics::counter!("compensations_total").increment(1);
        match action {
            CompensationAction::ReleaseStock {
                product_id,
                quantity,
            } => {
                if let Err(e) = inventory.release(product_id, *quantity).await {
                    tracing::error!(
                        %product_id,
                        quantity,
                        error = %e,
                        "compensation failed to release stock"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory::InMemoryInventory;

    #[test]
    fn records_reservation_and_undo_pairwise() {
        let mut txn = OrderTransaction::new();
        assert!(txn.is_empty());

        txn.record_reservation(ProductId::new("PROD-A"), 2);
        txn.record_reservation(ProductId::new("PROD-B"), 1);

        assert_eq!(txn.reservations().len(), 2);
        assert_eq!(
            txn.compensations()[0],
            CompensationAction::ReleaseStock {
                product_id: ProductId::new("PROD-A"),
                quantity: 2,
            }
        );
    }

    #[test]
    fn compensation_records_are_serializable() {
        let action = CompensationAction::ReleaseStock {
            product_id: ProductId::new("PROD-A"),
            quantity: 3,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "release_stock");
        assert_eq!(json["quantity"], 3);

        let back: CompensationAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[tokio::test]
    async fn executor_releases_every_reservation() {
        let inventory = InMemoryInventory::new();
        let a = ProductId::new("PROD-A");
        let b = ProductId::new("PROD-B");
        inventory.set_stock(a.clone(), 5);
        inventory.set_stock(b.clone(), 5);

        let mut txn = OrderTransaction::new();
        inventory.reserve(&a, 2).await.unwrap();
        txn.record_reservation(a.clone(), 2);
        inventory.reserve(&b, 3).await.unwrap();
        txn.record_reservation(b.clone(), 3);

        run_compensations(&inventory, &txn).await;

        assert_eq!(inventory.available(&a), 5);
        assert_eq!(inventory.available(&b), 5);
        assert_eq!(inventory.reserved(&a), 0);
        assert_eq!(inventory.reserved(&b), 0);
    }

    #[tokio::test]
    async fn empty_transaction_is_a_noop() {
        let inventory = InMemoryInventory::new();
        let txn = OrderTransaction::new();
        run_compensations(&inventory, &txn).await;
    }
}
