use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{OrderPatch, OrderStatus, PaymentStatus};
use crate::store::OrderStore;

pub const PROVISIONING_NOTE: &str = "Provisioning started";
pub const ACTIVATION_NOTE: &str = "Capacity is active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningDelays {
    /// Delay before the order is (re)marked as provisioning.
    pub provisioning: Duration,
    /// Further delay, after the first stage, before it becomes active.
    pub activation: Duration,
}

impl ProvisioningDelays {
    pub fn from_millis(provisioning_ms: u64, activation_ms: u64) -> Self {
        Self {
            provisioning: Duration::from_millis(provisioning_ms),
            activation: Duration::from_millis(activation_ms),
        }
    }

    pub fn total(&self) -> Duration {
        self.provisioning + self.activation
    }
}

impl Default for ProvisioningDelays {
    fn default() -> Self {
        Self::from_millis(1_500, 4_000)
    }
}

struct PendingChain {
    generation: u64,
    handle: JoinHandle<()>,
}

type ChainMap = HashMap<Uuid, PendingChain>;
type PendingChains = Arc<Mutex<ChainMap>>;

fn lock(pending: &Mutex<ChainMap>) -> MutexGuard<'_, ChainMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulates the two-stage provisioning backend with deferred transitions.
///
/// Each stage appends a timeline entry, even when the order already has that
/// stage's status. One chain is tracked per order id. Scheduling the same
/// order again starts a second chain without cancelling the first, so both
/// may apply their transitions. A transition also overwrites whatever status
/// was set by hand in the meantime, `failed` included.
pub struct TransitionScheduler {
    store: Weak<OrderStore>,
    delays: ProvisioningDelays,
    pending: PendingChains,
    closed: Arc<AtomicBool>,
    generation: AtomicU64,
}

impl TransitionScheduler {
    pub(crate) fn new(store: Weak<OrderStore>, delays: ProvisioningDelays) -> Self {
        Self {
            store,
            delays,
            pending: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn delays(&self) -> ProvisioningDelays {
        self.delays
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule_provisioning(&self, order_id: Uuid) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Scheduler is shut down, not scheduling order {}", order_id);
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let store = self.store.clone();
        let delays = self.delays;
        let pending = Arc::clone(&self.pending);
        let closed = Arc::clone(&self.closed);

        // Hold the lock across spawn so the chain cannot untrack itself
        // before it is tracked.
        let mut chains = lock(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delays.provisioning).await;
            apply(
                &store,
                &closed,
                order_id,
                OrderPatch::status(OrderStatus::Provisioning).with_note(PROVISIONING_NOTE),
            )
            .await;

            tokio::time::sleep(delays.activation).await;
            apply(
                &store,
                &closed,
                order_id,
                OrderPatch::status(OrderStatus::Active)
                    .with_payment_status(PaymentStatus::Paid)
                    .with_note(ACTIVATION_NOTE),
            )
            .await;

            let mut chains = lock(&pending);
            if chains.get(&order_id).map(|c| c.generation) == Some(generation) {
                chains.remove(&order_id);
            }
        });

        if chains
            .insert(order_id, PendingChain { generation, handle })
            .is_some()
        {
            debug!("Order {} already had a pending chain; both will run", order_id);
        }
        info!("Scheduled provisioning for order {}", order_id);
    }

    pub fn pending(&self, order_id: Uuid) -> bool {
        lock(&self.pending).contains_key(&order_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Aborts tracked chains and closes the scheduler; untracked chains see
    /// the closed flag and skip their remaining transitions.
    pub fn cancel_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let chains: Vec<PendingChain> = lock(&self.pending).drain().map(|(_, c)| c).collect();
        for chain in &chains {
            chain.handle.abort();
        }
        chains.len()
    }
}

impl Drop for TransitionScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn apply(
    store: &Weak<OrderStore>,
    closed: &AtomicBool,
    order_id: Uuid,
    patch: OrderPatch,
) {
    if closed.load(Ordering::SeqCst) {
        return;
    }
    let Some(store) = store.upgrade() else {
        return;
    };
    if store.apply_transition(order_id, patch).await.is_none() {
        warn!("Scheduled transition for unknown order {}", order_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{NewOrder, OrderPatch, OrderStatus, PaymentStatus};
    use crate::scheduler::ProvisioningDelays;
    use crate::store::OrderStore;
    use nimbus_store::InMemorySnapshotRepository;
    use std::sync::Arc;
    use std::time::Duration;

    async fn store() -> Arc<OrderStore> {
        OrderStore::hydrate(
            Arc::new(InMemorySnapshotRepository::new()),
            ProvisioningDelays::default(),
        )
        .await
    }

    fn settle() -> Duration {
        ProvisioningDelays::default().total() + Duration::from_millis(10)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_track_reaches_active() {
        let store = store().await;
        let id = store.fast_track_order(NewOrder::default()).await;

        let order = store.get_order(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Provisioning);
        assert_eq!(order.payment_status, PaymentStatus::AdminApproved);
        assert!(store.scheduler().pending(id));

        tokio::time::sleep(settle()).await;

        let order = store.get_order(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.timeline.len(), 3);
        assert_eq!(order.timeline[0].status, OrderStatus::Provisioning);
        assert_eq!(order.timeline[1].status, OrderStatus::Provisioning);
        assert_eq!(order.timeline[1].note, super::PROVISIONING_NOTE);
        assert_eq!(order.timeline[2].status, OrderStatus::Active);
        assert_eq!(order.timeline[2].note, super::ACTIVATION_NOTE);
        assert!(!store.scheduler().pending(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stages_fire_in_order() {
        let store = store().await;
        let delays = ProvisioningDelays::default();
        let id = store.fast_track_order(NewOrder::default()).await;

        tokio::time::sleep(delays.provisioning + Duration::from_millis(10)).await;
        assert_eq!(store.get_order(id).await.unwrap().status, OrderStatus::Provisioning);

        tokio::time::sleep(delays.activation).await;
        assert_eq!(store.get_order(id).await.unwrap().status, OrderStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_transitions() {
        let store = store().await;
        let id = store.fast_track_order(NewOrder::default()).await;

        store.shutdown();
        assert_eq!(store.scheduler().pending_count(), 0);

        tokio::time::sleep(settle()).await;
        assert_eq!(store.get_order(id).await.unwrap().status, OrderStatus::Provisioning);

        store.scheduler().schedule_provisioning(id);
        assert!(!store.scheduler().pending(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_transition_overwrites_manual_failure() {
        let store = store().await;
        let id = store.fast_track_order(NewOrder::default()).await;

        store
            .update_order(id, OrderPatch::status(OrderStatus::Failed).with_note("Array degraded"))
            .await;
        tokio::time::sleep(settle()).await;

        let order = store.get_order(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        let statuses: Vec<OrderStatus> = order.timeline.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Provisioning,
                OrderStatus::Failed,
                OrderStatus::Provisioning,
                OrderStatus::Active,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_schedule_keeps_both_chains() {
        let store = store().await;
        let id = store.fast_track_order(NewOrder::default()).await;
        store.scheduler().schedule_provisioning(id);
        assert_eq!(store.scheduler().pending_count(), 1);

        tokio::time::sleep(settle() + Duration::from_millis(10)).await;
        let order = store.get_order(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        // Both chains record both stages.
        let statuses: Vec<OrderStatus> = order.timeline.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Provisioning,
                OrderStatus::Provisioning,
                OrderStatus::Provisioning,
                OrderStatus::Active,
                OrderStatus::Active,
            ]
        );
        assert_eq!(store.scheduler().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_store_ignores_chain() {
        let repository = Arc::new(InMemorySnapshotRepository::new());
        let store = OrderStore::hydrate(repository.clone(), ProvisioningDelays::default()).await;
        let id = store.fast_track_order(NewOrder::default()).await;
        drop(store);

        tokio::time::sleep(settle()).await;
        let reloaded = OrderStore::hydrate(repository, ProvisioningDelays::default()).await;
        assert_eq!(reloaded.get_order(id).await.unwrap().status, OrderStatus::Provisioning);
    }
}
