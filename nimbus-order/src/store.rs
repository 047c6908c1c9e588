use chrono::Utc;
use nimbus_core::{normalize_country_code, normalize_currency_code, SnapshotRepository};
use nimbus_shared::{Masked, OrderCreatedEvent, OrderEvent, OrderStatusChangedEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{NewOrder, Order, OrderPatch, OrderStatus, PaymentStatus};
use crate::scheduler::{ProvisioningDelays, TransitionScheduler};
use crate::timeline::TimelineRecorder;

const EVENT_CAPACITY: usize = 256;

pub const FAST_TRACK_APPROVAL_NOTE: &str = "Approved by administrator";

/// Owns the order set for one application session.
///
/// Every mutation rewrites the full snapshot while still holding the write
/// lock, so snapshots are applied in mutation order. Persistence failures are
/// logged and swallowed.
pub struct OrderStore {
    orders: RwLock<Vec<Order>>,
    repository: Arc<dyn SnapshotRepository>,
    recorder: TimelineRecorder,
    scheduler: TransitionScheduler,
    events: broadcast::Sender<OrderEvent>,
}

impl OrderStore {
    /// Loads the latest snapshot. A missing or unreadable snapshot starts the
    /// store empty.
    pub async fn hydrate(
        repository: Arc<dyn SnapshotRepository>,
        delays: ProvisioningDelays,
    ) -> Arc<Self> {
        let orders = load_orders(repository.as_ref()).await;
        info!("Order store hydrated with {} orders", orders.len());

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new_cyclic(|store| Self {
            orders: RwLock::new(orders),
            repository,
            recorder: TimelineRecorder::new(),
            scheduler: TransitionScheduler::new(store.clone(), delays),
            events,
        })
    }

    /// Creates an order and returns its id.
    pub async fn create_order(&self, payload: NewOrder) -> Uuid {
        let status = payload.initial_status();
        let now = Utc::now();

        let mut orders = self.orders.write().await;

        let mut id = Uuid::new_v4();
        while orders.iter().any(|o| o.id == id) {
            id = Uuid::new_v4();
        }

        let order = Order {
            id,
            customer_type: payload.customer_type.unwrap_or_default(),
            customer_name: payload.customer_name,
            customer_email: payload.customer_email.map(Masked),
            country_code: normalize_country_code(payload.country_code.as_deref()),
            currency_code: normalize_currency_code(payload.currency_code.as_deref()),
            region: payload.region,
            tier_id: payload.tier_id,
            tier_name: payload.tier_name,
            quantity: payload.quantity.unwrap_or(1).max(1),
            months: payload.months.unwrap_or(1).max(1),
            billing: payload.billing.unwrap_or_default().non_negative(),
            payment_method: payload.payment_method,
            payment_status: payload.payment_status.unwrap_or_default(),
            status,
            timeline: vec![self.recorder.initial(status, payload.note, now)],
            notes: payload.notes,
            created_by: payload.created_by,
            reviewer: payload.reviewer,
            created_at: now,
            updated_at: now,
        };

        let event = OrderEvent::Created(OrderCreatedEvent {
            order_id: id,
            status: status.to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            region: order.region.clone(),
            tier_id: order.tier_id.clone(),
            timestamp: now.timestamp(),
        });

        info!("Order {} created in status {}", id, status);
        orders.push(order);
        self.persist(&orders).await;
        drop(orders);

        // No subscribers is fine.
        let _ = self.events.send(event);
        id
    }

    /// Merges `patch` into the order. See [`OrderStore::update_order_with`].
    pub async fn update_order(&self, id: Uuid, patch: OrderPatch) -> Option<Order> {
        self.update_order_with(id, move |_| patch).await
    }

    /// Computes a patch from the current order and merges it.
    ///
    /// `updated_at` is always refreshed. A status change appends exactly one
    /// timeline entry; re-setting the current status appends none. Returns
    /// `None` (and changes nothing) for an unknown id.
    pub async fn update_order_with<F>(&self, id: Uuid, updater: F) -> Option<Order>
    where
        F: FnOnce(&Order) -> OrderPatch + Send,
    {
        self.merge(id, updater, false).await
    }

    /// Applies a scheduled transition. Unlike [`OrderStore::update_order`],
    /// the timeline entry is appended even when the order is already in the
    /// target status.
    pub(crate) async fn apply_transition(&self, id: Uuid, patch: OrderPatch) -> Option<Order> {
        self.merge(id, move |_| patch, true).await
    }

    async fn merge<F>(&self, id: Uuid, updater: F, record_unchanged: bool) -> Option<Order>
    where
        F: FnOnce(&Order) -> OrderPatch + Send,
    {
        let mut orders = self.orders.write().await;

        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            debug!("Ignoring update for unknown order {}", id);
            return None;
        };

        let mut patch = updater(order);
        let next_status = patch.status.take();
        let note = patch.note.take();
        let previous = order.status;
        let now = Utc::now();

        patch.apply_fields(order);
        order.updated_at = now;

        let mut event = None;
        if let Some(next) = next_status.filter(|next| record_unchanged || *next != previous) {
            order.status = next;
            let entry = self.recorder.record(order, next, note, now);
            info!("Order {} moved {} -> {}", id, previous, next);
            event = Some(OrderEvent::StatusChanged(OrderStatusChangedEvent {
                order_id: id,
                from_status: previous.to_string(),
                to_status: next.to_string(),
                note: entry.note,
                timestamp: entry.timestamp.timestamp(),
            }));
        }

        let updated = order.clone();
        self.persist(&orders).await;
        drop(orders);

        if let Some(event) = event {
            let _ = self.events.send(event);
        }
        Some(updated)
    }

    /// Creates an administrator-approved order directly in provisioning and
    /// hands it to the transition scheduler.
    pub async fn fast_track_order(&self, mut payload: NewOrder) -> Uuid {
        payload.payment_status = Some(PaymentStatus::AdminApproved);
        payload.status = Some(OrderStatus::Provisioning);
        payload
            .note
            .get_or_insert_with(|| FAST_TRACK_APPROVAL_NOTE.to_string());

        let id = self.create_order(payload).await;
        self.scheduler.schedule_provisioning(id);
        id
    }

    pub async fn get_order(&self, id: Uuid) -> Option<Order> {
        self.orders.read().await.iter().find(|o| o.id == id).cloned()
    }

    /// All orders, newest first.
    pub async fn list_orders(&self) -> Vec<Order> {
        let mut orders = self.orders.read().await.clone();
        orders.reverse();
        orders
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    pub fn scheduler(&self) -> &TransitionScheduler {
        &self.scheduler
    }

    /// Cancels every pending scheduled transition. Also happens on drop.
    pub fn shutdown(&self) {
        let cancelled = self.scheduler.cancel_all();
        info!("Order store shut down, {} scheduled transitions cancelled", cancelled);
    }

    async fn persist(&self, orders: &[Order]) {
        let snapshot = match serde_json::to_string(orders) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to serialize order snapshot: {}", e);
                return;
            }
        };

        if let Err(e) = self.repository.save_snapshot(&snapshot).await {
            warn!("Failed to persist order snapshot: {}", e);
        }
    }
}

async fn load_orders(repository: &dyn SnapshotRepository) -> Vec<Order> {
    match repository.load_snapshot().await {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding unreadable order snapshot: {}", e);
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to load order snapshot: {}", e);
            Vec::new()
        }
    }
}
