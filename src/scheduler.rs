// Sleep/wake-aware refresh scheduler.
// One self re-arming timer per metric kind. Each firing publishes a refresh
// request and re-arms after the interval currently in the live configuration.
// While sleeping nothing is published and timers are not re-armed; waking
// restarts every cadence from zero.

use crate::bus::NotificationBus;
use crate::config::AppConfig;
use crate::models::{MetricKind, Notification, RefreshEvent};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Instant,
    /// Wake epoch the timer was armed in; older timers are stale.
    epoch: u64,
}

pub struct Scheduler {
    config: watch::Receiver<AppConfig>,
    timers: BTreeMap<MetricKind, Timer>,
    sleeping: bool,
    epoch: u64,
    ticks_published: u64,
    ticks_suppressed: u64,
}

impl Scheduler {
    pub fn new(config: watch::Receiver<AppConfig>) -> Self {
        Self {
            config,
            timers: BTreeMap::new(),
            sleeping: false,
            epoch: 0,
            ticks_published: 0,
            ticks_suppressed: 0,
        }
    }

    fn interval(&self, kind: MetricKind) -> Duration {
        self.config.borrow().scheduler.interval(kind)
    }

    /// Arms the timer for `kind`, due immediately. No-op while a current timer is armed.
    pub fn start(&mut self, kind: MetricKind) {
        if self.timers.get(&kind).is_some_and(|t| t.epoch == self.epoch) {
            return;
        }
        self.timers.insert(
            kind,
            Timer {
                deadline: Instant::now(),
                epoch: self.epoch,
            },
        );
        tracing::debug!(metric = %kind, "refresh timer started");
    }

    pub fn is_running(&self, kind: MetricKind) -> bool {
        self.timers.get(&kind).is_some_and(|t| t.epoch == self.epoch)
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Pending timers still fire once, then disarm without publishing.
    pub fn on_sleep(&mut self) {
        if self.sleeping {
            return;
        }
        self.sleeping = true;
        self.epoch += 1;
        tracing::info!("going to sleep; refresh timers suspended");
    }

    pub fn on_wake(&mut self) {
        self.sleeping = false;
        tracing::info!("awake; restarting refresh timers");
        for kind in MetricKind::ALL {
            self.start(kind);
        }
    }

    /// Earliest armed timer; ties go to the lower kind.
    pub fn next_due(&self) -> Option<(MetricKind, Instant)> {
        self.timers
            .iter()
            .min_by_key(|(kind, t)| (t.deadline, **kind))
            .map(|(kind, t)| (*kind, t.deadline))
    }

    /// Handles the firing of `kind`'s timer. Returns true when a refresh event was published.
    pub fn fire(&mut self, kind: MetricKind, bus: &mut NotificationBus) -> bool {
        let Some(timer) = self.timers.get(&kind).copied() else {
            return false;
        };
        if self.sleeping || timer.epoch != self.epoch {
            self.timers.remove(&kind);
            self.ticks_suppressed += 1;
            tracing::debug!(metric = %kind, "timer fired while asleep or stale; disarmed");
            return false;
        }

        bus.publish(&Notification::Refresh(RefreshEvent::now(kind)));
        self.ticks_published += 1;

        // Re-arm from the scheduled deadline so wake-up latency does not
        // accumulate; a timer fired very late restarts from now.
        let interval = self.interval(kind);
        self.timers.insert(
            kind,
            Timer {
                deadline: (timer.deadline + interval).max(Instant::now()),
                epoch: self.epoch,
            },
        );
        true
    }

    /// Waits for the next armed timer and fires it. Pends forever when nothing is armed.
    pub async fn tick(&mut self, bus: &mut NotificationBus) -> MetricKind {
        loop {
            let Some((kind, deadline)) = self.next_due() else {
                std::future::pending::<()>().await;
                continue;
            };
            tokio::time::sleep_until(deadline).await;
            if self.fire(kind, bus) {
                return kind;
            }
        }
    }

    pub fn ticks_published(&self) -> u64 {
        self.ticks_published
    }

    pub fn ticks_suppressed(&self) -> u64 {
        self.ticks_suppressed
    }
}
