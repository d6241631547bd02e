// Background telemetry worker.
// One task owns the bus, the scheduler and every state mutation; slow queries
// run elsewhere and re-enter through the main queue.

use crate::bus::{Handler, NotificationBus, SubscriptionId, SubscriptionIds};
use crate::config::AppConfig;
use crate::dispatch::MainQueue;
use crate::models::{Notification, NotificationKind};
use crate::samplers::{self, MemorySampler, NetworkSampler, PowerSampler};
use crate::scheduler::Scheduler;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Samplers and live configuration for the worker.
pub struct WorkerDeps {
    pub power: Arc<PowerSampler>,
    pub memory: Arc<MemorySampler>,
    pub network: Arc<NetworkSampler>,
    pub config: watch::Receiver<AppConfig>,
}

enum Control {
    Sleep,
    Wake,
    RefreshAll,
    SetNetworkDevice(Option<String>),
    Subscribe {
        id: SubscriptionId,
        kind: NotificationKind,
        handler: Handler,
    },
    Unsubscribe(SubscriptionId),
    Shutdown,
}

/// Cloneable handle for driving the worker from other tasks (signal handlers, consumers).
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<Control>,
    ids: SubscriptionIds,
}

impl WorkerHandle {
    fn send(&self, msg: Control) {
        if self.tx.send(msg).is_err() {
            tracing::debug!("worker has stopped; control message dropped");
        }
    }

    /// System is going to sleep.
    pub fn sleep(&self) {
        self.send(Control::Sleep);
    }

    /// System woke up; every cadence restarts.
    pub fn wake(&self) {
        self.send(Control::Wake);
    }

    /// Broadcasts `storeShouldRefresh` so every sampler refreshes now.
    pub fn refresh_all(&self) {
        self.send(Control::RefreshAll);
    }

    pub fn set_network_device(&self, device: Option<String>) {
        self.send(Control::SetNetworkDevice(device));
    }

    /// Registers `handler` on the worker's bus. The handler runs on the worker
    /// task and is removed when the returned guard is dropped.
    pub fn subscribe<F>(&self, kind: NotificationKind, handler: F) -> Subscription
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        let id = self.ids.next();
        self.send(Control::Subscribe {
            id,
            kind,
            handler: Box::new(handler),
        });
        Subscription {
            id,
            tx: self.tx.clone(),
        }
    }

    pub fn shutdown(&self) {
        self.send(Control::Shutdown);
    }
}

/// Keeps a bus handler registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<Control>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.tx.send(Control::Unsubscribe(self.id));
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

pub fn spawn(deps: WorkerDeps) -> (WorkerHandle, tokio::task::JoinHandle<()>) {
    let WorkerDeps {
        power,
        memory,
        network,
        config,
    } = deps;

    let mut bus = NotificationBus::new();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    let handle = WorkerHandle {
        tx: control_tx,
        ids: bus.ids(),
    };

    let stats_log_interval =
        Duration::from_secs(config.borrow().monitoring.stats_log_interval_secs.max(1));

    let task = tokio::spawn(async move {
        let (queue, mut completions) = MainQueue::channel();
        samplers::attach(power, &mut bus, &queue);
        samplers::attach(memory, &mut bus, &queue);
        samplers::attach(network.clone(), &mut bus, &queue);

        let mut scheduler = Scheduler::new(config);
        scheduler.on_wake();

        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut completions_applied: u64 = 0;

        loop {
            let next = scheduler.next_due();
            tokio::select! {
                _ = wait_until(next.map(|(_, at)| at)) => {
                    if let Some((kind, _)) = next {
                        scheduler.fire(kind, &mut bus);
                    }
                }
                Some(done) = completions.recv() => {
                    done(&mut bus);
                    completions_applied += 1;
                }
                msg = control_rx.recv() => match msg {
                    Some(Control::Sleep) => scheduler.on_sleep(),
                    Some(Control::Wake) => scheduler.on_wake(),
                    Some(Control::RefreshAll) => {
                        bus.publish(&Notification::StoreShouldRefresh);
                    }
                    Some(Control::SetNetworkDevice(device)) => network.set_device_override(device),
                    Some(Control::Subscribe { id, kind, handler }) => bus.insert(id, kind, handler),
                    Some(Control::Unsubscribe(id)) => {
                        bus.unsubscribe(id);
                    }
                    Some(Control::Shutdown) | None => {
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                },
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        sleeping = scheduler.is_sleeping(),
                        ticks_published = scheduler.ticks_published(),
                        ticks_suppressed = scheduler.ticks_suppressed(),
                        completions_applied,
                        notifications_published = bus.published_total(),
                        subscribers = bus.total_subscribers(),
                        "telemetry stats"
                    );
                }
            }
        }
    }
    .instrument(tracing::debug_span!("worker")));

    (handle, task)
}
