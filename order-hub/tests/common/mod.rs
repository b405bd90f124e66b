//! Shared test doubles: scripted print transport, scripted snapshot source, order fixtures.
#![allow(dead_code)]

use async_trait::async_trait;
use order_hub::availability::{SnapshotSource, SyncError, SyncResult};
use order_hub::printing::{PrintPayload, PrintTransport};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use shared::AvailabilityPayload;
use shared::order::{DeliveryAddress, DeliveryType, Order, OrderItem, OrderStatus, PaymentMethod};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use ticket_printer::{PrintError, PrintResult};

/// Print transport that records every call and fails on demand
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<PrintPayload>>,
    /// Payload texts containing any of these always fail
    fail_on: Mutex<Vec<String>>,
    /// Fail this many calls before succeeding
    fail_first: AtomicUsize,
    /// Hang this long on every call
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(marker: &str) -> Arc<Self> {
        let t = Self::default();
        t.fail_on.lock().push(marker.to_string());
        Arc::new(t)
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing_on("")
    }

    pub fn failing_first(n: usize) -> Arc<Self> {
        let t = Self::default();
        t.fail_first.store(n, Ordering::SeqCst);
        Arc::new(t)
    }

    pub fn hanging(delay: Duration) -> Arc<Self> {
        let t = Self::default();
        *t.delay.lock() = Some(delay);
        Arc::new(t)
    }

    pub fn calls(&self) -> Vec<PrintPayload> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Order ID of each printed payload, in call order
    pub fn order_ids(&self) -> Vec<String> {
        self.calls.lock().iter().map(|p| p.order_id.clone()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrintTransport for RecordingTransport {
    async fn send(&self, payload: &PrintPayload) -> PrintResult<()> {
        self.calls.lock().push(payload.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted_failure = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let marked = self
            .fail_on
            .lock()
            .iter()
            .any(|m| payload.text.contains(m.as_str()));
        if scripted_failure || marked {
            return Err(PrintError::Offline("printer unplugged".into()));
        }
        Ok(())
    }
}

/// Snapshot source with a mutable payload, a call counter and a failure switch
pub struct ScriptedSource {
    payload: Mutex<AvailabilityPayload>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(payload(&[("x-burger", true)], &[("bacon", true)])),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
        })
    }

    pub fn set_payload(&self, payload: AvailabilityPayload) {
        *self.payload.lock() = payload;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_snapshot(&self) -> SyncResult<AvailabilityPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Fetch("menu service down".into()));
        }
        Ok(self.payload.lock().clone())
    }
}

pub fn payload(products: &[(&str, bool)], ingredients: &[(&str, bool)]) -> AvailabilityPayload {
    AvailabilityPayload {
        products: products
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<HashMap<_, _>>(),
        ingredients: ingredients
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<HashMap<_, _>>(),
    }
}

pub fn delivery_order(id: &str) -> Order {
    Order {
        id: id.to_string(),
        number: Some(7),
        customer_name: "Carla".to_string(),
        customer_phone: Some("11 98888-1234".to_string()),
        delivery_type: DeliveryType::Delivery,
        address: Some(DeliveryAddress {
            street: "Av. Paulista".to_string(),
            number: Some("1000".to_string()),
            neighborhood: Some("Bela Vista".to_string()),
            ..Default::default()
        }),
        payment_method: PaymentMethod::Cash,
        change_for: Some(dec!(100)),
        items: vec![
            OrderItem::new("X-Burger", 1, dec!(25)).with_category("Burgers"),
            OrderItem::new("X-Burger", 1, dec!(25)).with_category("Burgers"),
            OrderItem::new("Coke", 1, dec!(6)).with_category("Drinks"),
        ],
        subtotal: dec!(56),
        delivery_fee: dec!(7),
        total: dec!(63),
        status: OrderStatus::Received,
        prep_time_minutes: Some(30),
        created_at: 1_705_912_335_000,
    }
}

pub fn pickup_order(id: &str) -> Order {
    Order {
        delivery_type: DeliveryType::Pickup,
        address: None,
        delivery_fee: dec!(0),
        total: dec!(56),
        payment_method: PaymentMethod::Card,
        change_for: None,
        ..delivery_order(id)
    }
}
