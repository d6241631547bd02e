// Scheduler cadence and sleep/wake behaviour, on paused tokio time

use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysmeter::bus::NotificationBus;
use sysmeter::config::{AppConfig, SchedulerConfig};
use sysmeter::models::{MetricKind, Notification, NotificationKind};
use sysmeter::scheduler::Scheduler;
use tokio::sync::watch;
use tokio::time::Instant;

fn config(power: u64, memory: u64, network: u64) -> AppConfig {
    AppConfig {
        scheduler: SchedulerConfig {
            power_refresh_interval_secs: power,
            memory_refresh_interval_secs: memory,
            network_refresh_interval_secs: network,
        },
        ..Default::default()
    }
}

/// Records the instant of every refresh request of `kind`, relative to `origin`.
fn record(bus: &mut NotificationBus, kind: MetricKind, origin: Instant) -> Arc<Mutex<Vec<Duration>>> {
    let times = Arc::new(Mutex::new(Vec::new()));
    let seen = times.clone();
    bus.subscribe(kind.refresh_kind(), move |n| {
        assert!(matches!(n, Notification::Refresh(e) if e.kind == kind));
        seen.lock().unwrap().push(origin.elapsed());
    });
    times
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_spaced_by_the_interval() {
    let (_tx, rx) = watch::channel(config(3, 60, 60));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let origin = Instant::now();
    let power = record(&mut bus, MetricKind::Power, origin);

    scheduler.start(MetricKind::Power);
    for _ in 0..4 {
        assert_eq!(scheduler.tick(&mut bus).await, MetricKind::Power);
    }
    assert_eq!(*power.lock().unwrap(), secs(&[0, 3, 6, 9]));
    assert_eq!(scheduler.ticks_published(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_each_kind_has_its_own_cadence() {
    let (_tx, rx) = watch::channel(config(2, 3, 5));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let origin = Instant::now();
    let power = record(&mut bus, MetricKind::Power, origin);
    let memory = record(&mut bus, MetricKind::Memory, origin);
    let network = record(&mut bus, MetricKind::Network, origin);

    scheduler.on_wake();
    let horizon = origin + Duration::from_secs(10);
    while scheduler.next_due().is_some_and(|(_, at)| at <= horizon) {
        scheduler.tick(&mut bus).await;
    }
    assert_eq!(*power.lock().unwrap(), secs(&[0, 2, 4, 6, 8, 10]));
    assert_eq!(*memory.lock().unwrap(), secs(&[0, 3, 6, 9]));
    assert_eq!(*network.lock().unwrap(), secs(&[0, 5, 10]));
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let (_tx, rx) = watch::channel(config(3, 60, 60));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let origin = Instant::now();
    let power = record(&mut bus, MetricKind::Power, origin);

    scheduler.start(MetricKind::Power);
    scheduler.start(MetricKind::Power);
    assert!(scheduler.is_running(MetricKind::Power));
    scheduler.tick(&mut bus).await;
    scheduler.start(MetricKind::Power);
    scheduler.tick(&mut bus).await;
    scheduler.tick(&mut bus).await;

    assert_eq!(*power.lock().unwrap(), secs(&[0, 3, 6]));
}

#[tokio::test(start_paused = true)]
async fn test_sleep_suppresses_every_tick() {
    let (_tx, rx) = watch::channel(config(3, 3, 3));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let published = Arc::new(Mutex::new(0usize));
    for kind in [
        NotificationKind::PowerRefresh,
        NotificationKind::MemoryRefresh,
        NotificationKind::NetworkRefresh,
    ] {
        let published = published.clone();
        bus.subscribe(kind, move |_| *published.lock().unwrap() += 1);
    }

    scheduler.on_wake();
    assert_eq!(scheduler.tick(&mut bus).await, MetricKind::Power);
    assert_eq!(*published.lock().unwrap(), 1);

    scheduler.on_sleep();
    assert!(scheduler.is_sleeping());
    let slept = tokio::time::timeout(Duration::from_secs(60), scheduler.tick(&mut bus)).await;
    assert!(slept.is_err(), "no refresh may be published while asleep");
    assert_eq!(*published.lock().unwrap(), 1);
    assert_eq!(scheduler.ticks_suppressed(), 3);
    assert_eq!(scheduler.next_due(), None);
    for kind in MetricKind::ALL {
        assert!(!scheduler.is_running(kind));
    }
}

#[tokio::test(start_paused = true)]
async fn test_wake_restarts_every_cadence_immediately() {
    let (_tx, rx) = watch::channel(config(3, 4, 5));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();

    scheduler.on_wake();
    for _ in 0..3 {
        scheduler.tick(&mut bus).await;
    }
    scheduler.on_sleep();
    tokio::time::advance(Duration::from_secs(3600)).await;

    let origin = Instant::now();
    let network = record(&mut bus, MetricKind::Network, origin);
    scheduler.on_wake();
    assert!(!scheduler.is_sleeping());
    for kind in MetricKind::ALL {
        assert!(scheduler.is_running(kind));
    }
    let mut fired = Vec::new();
    for _ in 0..3 {
        fired.push(scheduler.tick(&mut bus).await);
    }
    assert_eq!(fired, MetricKind::ALL.to_vec());
    assert_eq!(*network.lock().unwrap(), secs(&[0]));
}

#[tokio::test(start_paused = true)]
async fn test_timer_armed_before_sleep_does_not_fire_after_quick_wake() {
    let (_tx, rx) = watch::channel(config(10, 60, 60));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let origin = Instant::now();
    let power = record(&mut bus, MetricKind::Power, origin);

    scheduler.start(MetricKind::Power);
    scheduler.tick(&mut bus).await;
    tokio::time::advance(Duration::from_secs(4)).await;
    scheduler.on_sleep();
    scheduler.on_wake();
    scheduler.tick(&mut bus).await;
    scheduler.tick(&mut bus).await;

    // One fresh cadence from the wake at t=4; the pre-sleep deadline at t=10 is gone.
    assert_eq!(*power.lock().unwrap(), secs(&[0, 4, 14]));
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_applies_on_next_rearm() {
    let (tx, rx) = watch::channel(config(3, 60, 60));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let origin = Instant::now();
    let power = record(&mut bus, MetricKind::Power, origin);

    scheduler.start(MetricKind::Power);
    scheduler.tick(&mut bus).await;
    tx.send_replace(config(5, 60, 60));
    scheduler.tick(&mut bus).await;
    scheduler.tick(&mut bus).await;

    assert_eq!(*power.lock().unwrap(), secs(&[0, 3, 8]));
}

#[tokio::test(start_paused = true)]
async fn test_late_firing_does_not_shift_the_cadence() {
    let (_tx, rx) = watch::channel(config(3, 60, 60));
    let mut scheduler = Scheduler::new(rx);
    let mut bus = NotificationBus::new();
    let origin = Instant::now();

    scheduler.start(MetricKind::Power);
    scheduler.tick(&mut bus).await;
    // Timer serviced 500ms after its t=3 deadline.
    tokio::time::advance(Duration::from_millis(3500)).await;
    assert!(scheduler.fire(MetricKind::Power, &mut bus));
    assert_eq!(
        scheduler.next_due(),
        Some((MetricKind::Power, origin + Duration::from_secs(6)))
    );

    // Far behind schedule: restart from now instead of bursting to catch up.
    tokio::time::advance(Duration::from_secs(20)).await;
    assert!(scheduler.fire(MetricKind::Power, &mut bus));
    assert_eq!(scheduler.next_due(), Some((MetricKind::Power, Instant::now())));
}
