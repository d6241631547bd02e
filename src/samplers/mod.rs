// Samplers re-query one subsystem per refresh tick.
// Each sampler owns its state, runs the slow query off the worker task and
// applies the result back on it through the main queue. A tick that arrives
// while the previous query is still running is coalesced.

mod memory;
mod network;
mod power;

pub use memory::MemorySampler;
pub use network::{NetworkProbe, NetworkSampler, RateTracker};
pub use power::PowerSampler;

use crate::bus::{NotificationBus, SubscriptionId};
use crate::dispatch::MainQueue;
use crate::models::{MetricKind, NotificationKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something the scheduler can ask to re-sample.
pub trait Refreshable: Send + Sync + 'static {
    fn metric(&self) -> MetricKind;

    /// Start a refresh. Returns false when one is already in flight.
    fn refresh(self: Arc<Self>, queue: &MainQueue) -> bool;
}

/// Subscribes `sampler` to its own refresh event and to the global
/// `storeShouldRefresh` broadcast.
pub fn attach<S: Refreshable>(
    sampler: Arc<S>,
    bus: &mut NotificationBus,
    queue: &MainQueue,
) -> [SubscriptionId; 2] {
    let on_tick = {
        let sampler = sampler.clone();
        let queue = queue.clone();
        bus.subscribe(sampler.metric().refresh_kind(), move |_| {
            sampler.clone().refresh(&queue);
        })
    };
    let on_demand = {
        let queue = queue.clone();
        bus.subscribe(NotificationKind::StoreShouldRefresh, move |_| {
            sampler.clone().refresh(&queue);
        })
    };
    [on_tick, on_demand]
}

/// At-most-one-in-flight guard shared by the samplers.
#[derive(Debug, Default)]
pub(crate) struct InFlight(AtomicBool);

impl InFlight {
    /// True when the caller now owns the slot.
    pub(crate) fn begin(&self, metric: MetricKind) -> bool {
        let busy = self.0.swap(true, Ordering::AcqRel);
        if busy {
            tracing::debug!(metric = %metric, "refresh still in flight; tick coalesced");
        }
        !busy
    }

    pub(crate) fn finish(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
