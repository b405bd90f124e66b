//! Order workflow
//!
//! 订单状态推进：校验 → 持久化 → 进入 Preparing 时打印厨房单（外送单随后）。

use shared::{Order, OrderStatus, ValidationError, validate_transition};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::store::OrderStore;
use crate::printing::{PrintDispatchQueue, PrintJobKind, PrintPayload, QueueError, ReceiptFormatter};
use crate::utils::{AppError, AppResult};

/// Result of an accepted status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Print jobs enqueued by this change, kitchen first
    pub print_jobs: Vec<String>,
}

pub struct OrderWorkflow {
    store: Arc<dyn OrderStore>,
    formatter: ReceiptFormatter,
    queue: PrintDispatchQueue,
    /// Serializes read-validate-write so one order cannot be advanced twice
    transitions: Mutex<()>,
}

impl OrderWorkflow {
    pub fn new(store: Arc<dyn OrderStore>, formatter: ReceiptFormatter, queue: PrintDispatchQueue) -> Self {
        Self {
            store,
            formatter,
            queue,
            transitions: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &PrintDispatchQueue {
        &self.queue
    }

    /// Accept a new order snapshot into the store
    #[instrument(skip_all, fields(order_id = %order.id))]
    pub async fn submit(&self, order: Order) -> AppResult<Order> {
        order.validate()?;
        if order.status != OrderStatus::Received {
            return Err(ValidationError::field("status", "new orders start as received").into());
        }

        self.store.insert_order(order.clone()).await?;
        info!(items = order.items.len(), delivery = order.is_delivery(), "Order received");
        Ok(order)
    }

    /// Move an order one step forward.
    ///
    /// Invalid transitions are rejected before anything is written. Entering
    /// `Preparing` enqueues the kitchen ticket, then the courier ticket for
    /// delivery orders; if the queue refuses them the status is not changed.
    #[instrument(skip(self))]
    pub async fn advance(&self, order_id: &str, to: OrderStatus) -> AppResult<StatusChange> {
        let _guard = self.transitions.lock().await;

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {}", order_id)))?;
        let from = order.status;

        validate_transition(from, to)?;

        // Tickets are rendered and the queue checked before anything is
        // written, so a queue that refuses work leaves the order untouched.
        let tickets = if to == OrderStatus::Preparing {
            if self.queue.is_shut_down() {
                return Err(QueueError::ShutDown.into());
            }
            self.render_tickets(&order)
        } else {
            Vec::new()
        };

        self.store.update_status(order_id, to).await?;
        info!(from = %from, to = %to, "Order status changed");

        let print_jobs = if tickets.is_empty() {
            Vec::new()
        } else {
            match self.queue.enqueue_batch(tickets) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(error = %e, "Print queue refused tickets, reverting status");
                    self.store.update_status(order_id, from).await?;
                    return Err(e.into());
                }
            }
        };

        Ok(StatusChange {
            order_id: order_id.to_string(),
            from,
            to,
            print_jobs,
        })
    }

    /// [`advance`](Self::advance) for status values coming from outside
    pub async fn advance_str(&self, order_id: &str, to: &str) -> AppResult<StatusChange> {
        let to: OrderStatus = to.parse().map_err(ValidationError::from)?;
        self.advance(order_id, to).await
    }

    /// Kitchen ticket first, then the courier ticket for delivery orders
    fn render_tickets(&self, order: &Order) -> Vec<(PrintJobKind, PrintPayload)> {
        let mut kinds = vec![PrintJobKind::Kitchen];
        if order.is_delivery() {
            kinds.push(PrintJobKind::Courier);
        }

        kinds
            .into_iter()
            .map(|kind| {
                let text = self.formatter.format(order, kind);
                (kind, PrintPayload::new(order.id.clone(), text))
            })
            .collect()
    }
}
