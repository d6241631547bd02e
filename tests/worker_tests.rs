// Worker integration test: spawn with scripted sources, drive through the handle, shutdown

mod common;

use common::{FixedPowerSources, RampMemorySource, ScriptedRunner};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sysmeter::config::{AppConfig, SchedulerConfig};
use sysmeter::models::{Notification, NotificationKind};
use sysmeter::samplers::{MemorySampler, NetworkSampler, PowerSampler};
use sysmeter::worker::{self, Subscription, WorkerDeps, WorkerHandle};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn start() -> (WorkerHandle, JoinHandle<()>, Arc<NetworkSampler>) {
    let config = AppConfig {
        scheduler: SchedulerConfig {
            power_refresh_interval_secs: 1,
            memory_refresh_interval_secs: 1,
            network_refresh_interval_secs: 1,
        },
        ..Default::default()
    };
    let (_tx, rx) = watch::channel(config.clone());
    let network = Arc::new(NetworkSampler::new(
        Arc::new(ScriptedRunner::macos()),
        config.commands.clone(),
        &config.network,
    ));
    let (handle, task) = worker::spawn(WorkerDeps {
        power: Arc::new(PowerSampler::new(Arc::new(FixedPowerSources(vec![
            common::half_charged_battery(),
        ])))),
        memory: Arc::new(MemorySampler::new(
            Arc::new(RampMemorySource::default()),
            config.memory.history_capacity,
        )),
        network: network.clone(),
        config: rx,
    });
    (handle, task, network)
}

fn forward(
    handle: &WorkerHandle,
    kind: NotificationKind,
) -> (Subscription, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = handle.subscribe(kind, move |n| {
        let _ = tx.send(n.clone());
    });
    (sub, rx)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    timeout(WAIT, rx.recv())
        .await
        .expect("notification within timeout")
        .expect("worker alive")
}

#[tokio::test]
async fn worker_publishes_every_reading() {
    let (handle, task, _) = start();
    let (_power, mut power_rx) = forward(&handle, NotificationKind::PowerUpdated);
    let (_memory, mut memory_rx) = forward(&handle, NotificationKind::MemoryUpdated);
    let (_network, mut network_rx) = forward(&handle, NotificationKind::NetworkUpdated);
    handle.refresh_all();

    match next(&mut power_rx).await {
        Notification::PowerUpdated(p) => {
            assert!(p.valid);
            assert_eq!(p.charge(), 0.5);
        }
        other => panic!("unexpected {other:?}"),
    }
    match next(&mut memory_rx).await {
        Notification::MemoryUpdated(m) => {
            assert!(!m.history.is_empty());
            assert!(m.history.len() <= 50);
        }
        other => panic!("unexpected {other:?}"),
    }
    match next(&mut network_rx).await {
        Notification::NetworkUpdated(r) => {
            assert_eq!(r.device, "en0");
            assert_eq!(r.active_port.map(|p| p.device), Some("en0".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }

    handle.shutdown();
    timeout(WAIT, task).await.expect("worker stops").expect("worker task");
}

#[tokio::test]
async fn dropped_subscription_stops_receiving() {
    let (handle, task, _) = start();
    let dropped_count = Arc::new(AtomicUsize::new(0));
    let counter = dropped_count.clone();
    let dropped = handle.subscribe(NotificationKind::PowerUpdated, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    drop(dropped);

    // Control messages are ordered: once the later subscriber hears anything,
    // the unsubscribe has been applied.
    let (_sentinel, mut sentinel_rx) = forward(&handle, NotificationKind::PowerUpdated);
    handle.refresh_all();
    next(&mut sentinel_rx).await;
    let snapshot = dropped_count.load(Ordering::SeqCst);

    handle.refresh_all();
    next(&mut sentinel_rx).await;
    next(&mut sentinel_rx).await;
    assert_eq!(dropped_count.load(Ordering::SeqCst), snapshot);

    handle.shutdown();
    timeout(WAIT, task).await.expect("worker stops").expect("worker task");
}

#[tokio::test]
async fn device_override_is_applied_to_later_samples() {
    let (handle, task, network) = start();
    let (_sub, mut rx) = forward(&handle, NotificationKind::NetworkUpdated);
    handle.set_network_device(Some("en3".into()));
    handle.refresh_all();

    let reading = timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Some(Notification::NetworkUpdated(r)) if r.device == "en3" => return r,
                Some(_) => continue,
                None => panic!("worker stopped"),
            }
        }
    })
    .await
    .expect("reading for en3");
    assert_eq!(reading.usage.in_bytes, 70);
    assert_eq!(network.device_override().as_deref(), Some("en3"));

    handle.shutdown();
    timeout(WAIT, task).await.expect("worker stops").expect("worker task");
}

#[tokio::test]
async fn sleep_silences_the_worker_until_wake() {
    let (handle, task, _) = start();
    let (_sub, mut rx) = forward(&handle, NotificationKind::MemoryUpdated);
    handle.refresh_all();
    next(&mut rx).await;

    handle.sleep();
    // Let refreshes that were already running land.
    tokio::time::sleep(Duration::from_millis(300)).await;
    while rx.try_recv().is_ok() {}

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(rx.try_recv().is_err(), "no scheduled refresh while asleep");

    handle.wake();
    next(&mut rx).await;

    handle.shutdown();
    timeout(WAIT, task).await.expect("worker stops").expect("worker task");
}

#[tokio::test]
async fn worker_stops_when_every_handle_is_dropped() {
    let (handle, task, _) = start();
    drop(handle);
    timeout(WAIT, task).await.expect("worker stops").expect("worker task");
}
