//! Order store
//!
//! The order store owns order records; this service only reads snapshots and
//! writes status changes through [`OrderStore`].

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::{Order, OrderStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already exists: {0}")]
    Conflict(String),

    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for orders
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>>;

    async fn insert_order(&self, order: Order) -> StoreResult<()>;

    /// Persist a status change. Transition rules are checked by the caller.
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()>;
}

/// 内存订单存储 (tests and standalone runs)
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.get(order_id).map(|o| o.value().clone()))
    }

    async fn insert_order(&self, order: Order) -> StoreResult<()> {
        match self.orders.entry(order.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(order.id)),
            Entry::Vacant(slot) => {
                slot.insert(order);
                Ok(())
            }
        }
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(order_id.to_string()))?;
        order.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::order::{DeliveryType, OrderItem, PaymentMethod};

    fn order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            number: None,
            customer_name: "Bruno".to_string(),
            customer_phone: None,
            delivery_type: DeliveryType::Pickup,
            address: None,
            payment_method: PaymentMethod::Card,
            change_for: None,
            items: vec![OrderItem::new("Fries", 1, dec!(8))],
            subtotal: dec!(8),
            delivery_fee: dec!(0),
            total: dec!(8),
            status: OrderStatus::Received,
            prep_time_minutes: None,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let store = InMemoryOrderStore::new();
        store.insert_order(order("a")).await.unwrap();
        assert_eq!(store.len(), 1);

        store.update_status("a", OrderStatus::Preparing).await.unwrap();
        let stored = store.get_order("a").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
        assert!(store.get_order("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemoryOrderStore::new();
        store.insert_order(order("a")).await.unwrap();
        let err = store.insert_order(order("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == "a"));
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let store = InMemoryOrderStore::new();
        let err = store.update_status("x", OrderStatus::Preparing).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
