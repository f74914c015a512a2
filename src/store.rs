//! Order store boundary.
//!
//! Persistence is a collaborator, not part of the core: the portal keeps
//! orders wherever it likes and hands the core this interface. The
//! in-memory implementation backs tests and embedding scenarios.

use parking_lot::RwLock;

use crate::error::{ScheduleError, ScheduleResult};
use crate::types::Order;

/// Keyed order record store.
pub trait OrderStore: Send + Sync {
    /// Snapshot of the full order collection.
    fn get_all_orders(&self) -> ScheduleResult<Vec<Order>>;

    /// Apply a transform to the matching record and return the full updated
    /// collection. No-op (collection returned unchanged) if the order
    /// number is unknown.
    fn update_order_by_number(
        &self,
        order_number: &str,
        updater: &mut dyn FnMut(&mut Order),
    ) -> ScheduleResult<Vec<Order>>;
}

/// In-memory order store. Last-write-wins at the granularity of a single
/// order record, matching the shared-resource policy of the portal.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: RwLock::new(orders),
        }
    }

    /// Insert a new order; replaces any existing record with the same number.
    pub fn upsert(&self, order: Order) {
        let mut orders = self.orders.write();
        match orders.iter_mut().find(|o| o.order_number == order.order_number) {
            Some(existing) => *existing = order,
            None => orders.push(order),
        }
    }

    pub fn get(&self, order_number: &str) -> Option<Order> {
        self.orders
            .read()
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned()
    }
}

impl OrderStore for MemoryOrderStore {
    fn get_all_orders(&self) -> ScheduleResult<Vec<Order>> {
        Ok(self.orders.read().clone())
    }

    fn update_order_by_number(
        &self,
        order_number: &str,
        updater: &mut dyn FnMut(&mut Order),
    ) -> ScheduleResult<Vec<Order>> {
        let mut orders = self.orders.write();
        if let Some(order) = orders.iter_mut().find(|o| o.order_number == order_number) {
            updater(order);
        }
        Ok(orders.clone())
    }
}

/// Convenience lookup that fails with a typed error when the order is
/// missing (commit paths need the distinction; the raw trait does not).
pub fn require_order(orders: &[Order], order_number: &str) -> ScheduleResult<Order> {
    orders
        .iter()
        .find(|o| o.order_number == order_number)
        .cloned()
        .ok_or_else(|| ScheduleError::OrderNotFound(order_number.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(number: &str) -> Order {
        Order {
            order_number: number.to_string(),
            customer_name: "Test Customer".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn update_is_noop_for_unknown_order() {
        let store = MemoryOrderStore::with_orders(vec![order("SO-1")]);
        let result = store
            .update_order_by_number("SO-404", &mut |o| o.customer_name = "changed".into())
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].customer_name, "Test Customer");
    }

    #[test]
    fn update_transforms_matching_record_and_returns_collection() {
        let store = MemoryOrderStore::with_orders(vec![order("SO-1"), order("SO-2")]);
        let result = store
            .update_order_by_number("SO-2", &mut |o| o.customer_name = "changed".into())
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].customer_name, "changed");
        assert_eq!(store.get("SO-2").unwrap().customer_name, "changed");
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let store = MemoryOrderStore::new();
        store.upsert(order("SO-1"));
        let mut replacement = order("SO-1");
        replacement.customer_name = "Replaced".to_string();
        store.upsert(replacement);

        let all = store.get_all_orders().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].customer_name, "Replaced");
    }

    #[test]
    fn require_order_reports_missing_number() {
        let err = require_order(&[order("SO-1")], "SO-9").unwrap_err();
        assert!(matches!(err, ScheduleError::OrderNotFound(n) if n == "SO-9"));
    }
}
